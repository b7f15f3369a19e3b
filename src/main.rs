use dnslookup::{resolver::Resolver, shell, transport::Transport};
use std::{env, net::IpAddr, process::ExitCode};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // install global collector configured based on RUST_LOG env var.
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (root_arg, single_probe) = match args.as_slice() {
        [root] => (root, false),
        [root, flag] if flag == "-p1" => (root, true),
        _ => {
            eprintln!("Invalid call. Usage:");
            eprintln!("\tdnslookup rootServer [-p1]");
            eprintln!("where rootServer is the IP address (in dotted form) of the root DNS server to start the search at.");
            return ExitCode::FAILURE;
        }
    };

    let root: IpAddr = match root_arg.parse() {
        Ok(address) => address,
        Err(err) => {
            eprintln!("Invalid root server ({err}).");
            return ExitCode::FAILURE;
        }
    };
    println!("Root DNS server is: {root}");

    info!(%root, single_probe, "Starting");

    let transport = match Transport::bind().await {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("Failed to open a UDP socket ({err}).");
            return ExitCode::FAILURE;
        }
    };

    let resolver = Resolver::new(transport, root).with_single_probe(single_probe);

    match shell::run(resolver).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("I/O error ({err}).");
            ExitCode::FAILURE
        }
    }
}

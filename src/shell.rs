use crate::{
    protocol::{Record, RecordType},
    resolver::Resolver,
    transport::Socket,
};
use std::io::{IsTerminal, Write};
use std::net::IpAddr;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One parsed shell line.
#[derive(Debug, PartialEq)]
enum Command {
    Lookup { name: String, rtype: RecordType },
    Trace(bool),
    Server(IpAddr),
    Dump,
    Quit,
}

/// Parses a command line. `Ok(None)` means there was nothing to do (blank
/// line or pure comment); `Err` carries the diagnostic to print.
fn parse(line: &str) -> Result<Option<Command>, String> {
    // Anything after a comment character is ignored
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }

    let args: Vec<&str> = line.split_whitespace().collect();
    let command = args[0].to_ascii_lowercase();

    match command.as_str() {
        "quit" | "exit" => Ok(Some(Command::Quit)),
        "server" => match args[..] {
            [_, address] => address
                .parse()
                .map(|address| Some(Command::Server(address)))
                .map_err(|err| format!("Invalid root server ({err}).")),
            _ => Err("Invalid call. Format:\n\tserver IP".to_string()),
        },
        "trace" => match args[..] {
            [_, setting] if setting.eq_ignore_ascii_case("on") => Ok(Some(Command::Trace(true))),
            [_, setting] if setting.eq_ignore_ascii_case("off") => Ok(Some(Command::Trace(false))),
            _ => Err("Invalid call. Format:\n\ttrace on|off".to_string()),
        },
        "lookup" | "l" => {
            let (name, rtype) = match args[..] {
                [_, name] => (name, RecordType::A),
                [_, name, rtype] => match RecordType::from_name(rtype) {
                    Some(rtype) => (name, rtype),
                    None => {
                        return Err(
                            "Invalid query type. Must be one of:\n\tA, AAAA, NS, MX, CNAME"
                                .to_string(),
                        )
                    }
                },
                _ => return Err("Invalid call. Format:\n\tlookup hostName [type]".to_string()),
            };
            Ok(Some(Command::Lookup {
                name: name.to_string(),
                rtype,
            }))
        }
        "dump" => Ok(Some(Command::Dump)),
        _ => Err("Invalid command. Valid commands are:\n\tlookup fqdn [type]\n\ttrace on|off\n\tserver IP\n\tdump\n\tquit"
            .to_string()),
    }
}

/// Prints a result set in the fixed column layout shared by `lookup` and
/// `dump`. An empty set prints the sentinel line.
fn print_records(name: &str, rtype: RecordType, records: &[Record]) {
    if records.is_empty() {
        println!("{:<30} {:<5} {:<8} {}", name, rtype, -1, "0.0.0.0");
    }
    for record in records {
        println!(
            "{:<30} {:<5} {:<8} {}",
            name,
            rtype,
            record.ttl(),
            record.rdata()
        );
    }
}

/// Runs the interactive loop until end-of-file or `quit`.
pub async fn run<S: Socket + Send + Sync>(mut resolver: Resolver<S>) -> std::io::Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            print!("dnslookup> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(diagnostic) => {
                eprintln!("{diagnostic}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Server(address) => {
                resolver.set_root(address);
                println!("Root DNS server is now: {address}");
            }
            Command::Trace(enabled) => {
                resolver.set_trace(enabled);
                println!(
                    "Verbose tracing is now: {}",
                    if enabled { "ON" } else { "OFF" }
                );
            }
            Command::Lookup { name, rtype } => {
                let records = resolver.resolve(&name, rtype, 0).await;
                print_records(&name, rtype, &records);
            }
            Command::Dump => {
                resolver.for_each_cached(print_records);
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

use std::net::IpAddr;
use thiserror::Error;

/// Failure of a single query exchange. The resolver converts these into
/// empty result sets at one seam; they never abort a lookup.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no reply from {server} after {attempts} attempts")]
    Timeout { server: IpAddr, attempts: u32 },
}

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to set up an event source or decode its input.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Cannot read events from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read events from stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// The input is not an envelope or an array of envelopes.
    #[error("Malformed event input: {0}")]
    Malformed(String),

    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

//! Error types for the HTTP transport.

use std::net::SocketAddr;
use thiserror::Error;

/// Errors returned while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Server loop terminated with an IO error.
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

//! Error types for the HTTP listener.

use std::io;

use thiserror::Error;

/// Errors surfaced while binding or running the HTTP listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The endpoint could not be bound.
    #[error("failed to bind HTTP listener at {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// The socket could not report its address.
    #[error("failed to read the bound address: {source}")]
    LocalAddr {
        #[source]
        source: io::Error,
    },
    /// The accept loop failed.
    #[error("HTTP server stopped: {source}")]
    Serve {
        #[source]
        source: io::Error,
    },
}

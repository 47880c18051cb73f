//! Error type shared by the gateway's connection, scheduler and server.

use std::net::SocketAddr;

use agv_core::CommandError;
use thiserror::Error;

/// Errors surfaced by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A command argument cannot be encoded (target id above 999, non-ASCII
    /// state).
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CommandError),

    /// The listening socket could not be created, bound or put into listen
    /// mode.
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the controller to connect failed.
    #[error("accept failed on {addr}: {source}")]
    AcceptFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed its side of the connection (read returned EOF).
    #[error("connection closed by peer")]
    Closed,

    /// The writer task is gone, so nothing more can be sent.
    #[error("connection writer has stopped")]
    WriterStopped,
}

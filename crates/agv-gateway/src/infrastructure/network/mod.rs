//! Network infrastructure for the gateway.
//!
//! # Sub-modules
//!
//! - **`acceptor`** – Binds the listening socket and waits for the single
//!   controller connection.
//!
//! - **`connection`** – Splits the accepted stream into a reader (the echo
//!   responder's `FrameSource`) and a handle to the single writer task (the
//!   `FrameSink` shared by callers, the scheduler and the responder).

pub mod acceptor;
pub mod connection;

pub use acceptor::{accept, Acceptor, DEFAULT_BACKLOG};
pub use connection::{Connection, ConnectionHandle, ConnectionReader, DEFAULT_WRITE_QUEUE};

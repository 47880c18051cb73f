//! agv-gateway library crate.
//!
//! A single-connection TCP endpoint for an AGV fleet controller.  It accepts
//! one controller, sends command frames on demand or repeatedly at a fixed
//! cadence, and answers the controller's `FFFAH` handshakes.
//!
//! # Architecture
//!
//! ```text
//! external caller
//!        │  send_command / send_command_repeated
//!        ▼
//! [agv-gateway]
//!   ├── server          GatewayServer facade, task wiring, shutdown
//!   ├── application/    Scheduler, echo responder, FrameSink/FrameSource
//!   └── infrastructure/
//!         ├── network/  Acceptor, split connection, single writer task
//!         └── config    TOML configuration
//!        │
//!        ▼
//! controller  (14-byte STX/ETX frames over TCP, see `agv_core`)
//! ```
//!
//! # Layer rules
//!
//! - `application` depends on `agv-core` and its own traits only.
//! - `infrastructure` implements those traits with `tokio` sockets.

/// Application layer: scheduling, handshake echo, transport traits.
pub mod application;

/// Error type shared across the crate.
pub mod error;

/// Infrastructure layer: TCP sockets and configuration.
pub mod infrastructure;

/// The `GatewayServer` facade.
pub mod server;

pub use application::echo_handshake::EchoExit;
pub use error::GatewayError;
pub use infrastructure::config::{load_config, ConfigError, GatewayConfig};
pub use server::{GatewayServer, ShutdownReport};

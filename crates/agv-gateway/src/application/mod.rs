//! Application layer use cases for the gateway.
//!
//! Nothing in here opens a socket.  The use cases talk to the connection
//! through the traits in [`transport`], so they can be driven by in-memory
//! fakes in tests and by the TCP connection in production.
//!
//! # Sub-modules
//!
//! - **`schedule_commands`** – The pending-command table and the periodic
//!   scheduler that sends each scheduled key the requested number of times.
//!
//! - **`echo_handshake`** – The read loop that answers `FFFAH` handshakes and
//!   stops on the first malformed message.
//!
//! - **`shutdown`** – The signal that stops both loops and the writer.
//!
//! - **`transport`** – `FrameSink` / `FrameSource`, the seams to the socket.

pub mod echo_handshake;
pub mod schedule_commands;
pub mod shutdown;
pub mod transport;

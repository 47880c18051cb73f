//! # agv-core
//!
//! Protocol and domain types for the AGV vision gateway.
//!
//! The gateway talks to a fleet controller over a single TCP connection using
//! 14-byte ASCII frames:
//!
//! ```text
//! <STX> AFFFV 700 00 1 <checksum> <ETX>
//!       code  id  -- state
//! ```
//!
//! This crate holds everything that can be expressed without a socket:
//!
//! - **`domain`** – validated command arguments: [`TargetId`] (0–999),
//!   [`AgvState`] (one ASCII character) and [`CommandKey`], the pair that keys
//!   scheduled commands.
//! - **`protocol`** – the one-hex-digit checksum, the frame encoder/decoder
//!   and the `FFFAH` → `AFFFH` handshake reply.
//!
//! It has no dependencies on async runtimes, sockets or logging, so every
//! function here is deterministic and unit-testable.

pub mod domain;
pub mod protocol;

pub use domain::command::{AgvState, CommandError, CommandKey, TargetId, MAX_TARGET_ID};
pub use protocol::frame::{decode_frame, encode_command, encode_command_raw, Frame, FrameError};
pub use protocol::handshake::handshake_reply;

//! Echo responder: answers handshake frames from the controller.
//!
//! Each iteration reads one message, validates its framing and, if its code
//! is `FFFAH`, writes the `AFFFH` reply back through the sink:
//!
//! ```text
//! WAIT_FRAME ──► VALIDATE ──► RESPOND ──► WAIT_FRAME
//!                   │    └───► DROP ─────► WAIT_FRAME
//!                   └── malformed ──► stop for good
//! ```
//!
//! A message that is not a well-formed frame stops the responder
//! permanently; the connection itself stays open for commands.

use std::fmt;

use agv_core::{decode_frame, handshake_reply, Frame, FrameError};
use tracing::{debug, info, warn};

use crate::application::shutdown::ShutdownListener;
use crate::application::transport::{FrameSink, FrameSource};
use crate::error::GatewayError;

/// Read size per iteration.
pub const RECEIVE_BUFFER: usize = 1024;

/// Why the responder loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoExit {
    /// A message failed framing validation.
    Malformed(FrameError),
    /// The peer closed the connection.
    Closed,
    /// Reading, or writing a reply, failed.
    Failed(String),
    /// The shutdown signal fired.
    Shutdown,
}

impl fmt::Display for EchoExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "{e}"),
            Self::Closed => f.write_str("connection closed by peer"),
            Self::Failed(e) => write!(f, "I/O failure: {e}"),
            Self::Shutdown => f.write_str("shutdown requested"),
        }
    }
}

/// Result of one successful iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoOutcome {
    /// A handshake was answered with this frame.
    Replied(Frame),
    /// A well-formed non-handshake frame was dropped.
    Ignored(Frame),
}

pub struct EchoResponder<R: FrameSource, S: FrameSink> {
    source: R,
    sink: S,
    buffer_size: usize,
}

impl<R: FrameSource, S: FrameSink> EchoResponder<R, S> {
    pub fn new(source: R, sink: S) -> Self {
        Self::with_buffer_size(source, sink, RECEIVE_BUFFER)
    }

    /// Uses a custom read size (at least one byte).
    pub fn with_buffer_size(source: R, sink: S, buffer_size: usize) -> Self {
        Self {
            source,
            sink,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Handles a single inbound message.
    ///
    /// # Errors
    ///
    /// Returns the [`EchoExit`] that ends the loop.
    pub async fn step(&mut self) -> Result<EchoOutcome, EchoExit> {
        let raw = match self.source.receive(self.buffer_size).await {
            Ok(raw) => raw,
            Err(GatewayError::Closed) => return Err(EchoExit::Closed),
            Err(e) => return Err(EchoExit::Failed(e.to_string())),
        };

        let frame = decode_frame(&raw).map_err(EchoExit::Malformed)?;
        if !frame.has_valid_checksum() {
            debug!(frame = %frame, "inbound checksum mismatch");
        }

        match handshake_reply(&frame) {
            Some(reply) => {
                self.sink
                    .send_frame(reply)
                    .await
                    .map_err(|e| EchoExit::Failed(e.to_string()))?;
                debug!(request = %frame, reply = %reply, "answered handshake");
                Ok(EchoOutcome::Replied(reply))
            }
            None => {
                debug!(frame = %frame, "ignored inbound frame");
                Ok(EchoOutcome::Ignored(frame))
            }
        }
    }

    /// Loops over [`step`](Self::step) until it fails or `shutdown` fires.
    ///
    /// A read blocked on an idle connection is abandoned as soon as the
    /// signal fires.
    pub async fn run(mut self, mut shutdown: ShutdownListener) -> EchoExit {
        let exit = loop {
            tokio::select! {
                _ = shutdown.triggered() => break EchoExit::Shutdown,
                result = self.step() => {
                    if let Err(exit) = result {
                        break exit;
                    }
                }
            }
        };

        match &exit {
            EchoExit::Malformed(e) => warn!("echo responder stopped: {}", e),
            EchoExit::Failed(e) => warn!("echo responder stopped: {}", e),
            EchoExit::Closed | EchoExit::Shutdown => {
                info!(reason = %exit, "echo responder stopped")
            }
        }
        exit
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

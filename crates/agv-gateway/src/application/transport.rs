//! Transport abstractions used by the scheduler and the echo responder.
//!
//! The use cases never touch a socket directly.  They write through a
//! [`FrameSink`] and read through a [`FrameSource`]; the infrastructure layer
//! supplies the TCP-backed implementations and tests supply recording fakes.

use std::sync::Arc;

use agv_core::Frame;
use async_trait::async_trait;

use crate::error::GatewayError;

/// Destination for outbound frames.
///
/// Implementations must deliver each frame atomically: two concurrent calls
/// never interleave their bytes on the wire.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Sends one frame and returns the number of bytes written.
    async fn send_frame(&self, frame: Frame) -> Result<usize, GatewayError>;
}

#[async_trait]
impl<T: FrameSink + ?Sized> FrameSink for Arc<T> {
    async fn send_frame(&self, frame: Frame) -> Result<usize, GatewayError> {
        (**self).send_frame(frame).await
    }
}

/// Source of inbound messages.
#[async_trait]
pub trait FrameSource: Send {
    /// Reads whatever has arrived, up to `max_bytes`.
    ///
    /// The result is not guaranteed to be frame-aligned.  Returns
    /// [`GatewayError::Closed`] once the peer has closed the stream.
    async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, GatewayError>;
}

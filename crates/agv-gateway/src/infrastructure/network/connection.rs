//! The accepted controller connection.
//!
//! After accept, the stream is split in two:
//!
//! ```text
//!                        ┌──────────────────┐
//!  ConnectionHandle ──►  │  mpsc channel    │ ──► writer task ──► OwnedWriteHalf
//!  (clone per caller)    └──────────────────┘         │
//!        ▲                                             └─ oneshot reply: bytes | io error
//!        │
//!  ConnectionReader ◄── OwnedReadHalf
//! ```
//!
//! Every write goes through the single writer task, one request at a time,
//! so two frames never interleave on the wire no matter how many tasks send
//! concurrently.

use std::io;
use std::net::SocketAddr;

use agv_core::Frame;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::shutdown::ShutdownListener;
use crate::application::transport::{FrameSink, FrameSource};
use crate::error::GatewayError;

/// Queued writes allowed before senders wait.
pub const DEFAULT_WRITE_QUEUE: usize = 64;

/// The single live stream to the controller.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    local: SocketAddr,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr, local: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            local,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Splits the stream and starts the writer task.
    ///
    /// The writer stops when `shutdown` fires or every [`ConnectionHandle`]
    /// is dropped.
    pub fn into_split(
        self,
        shutdown: ShutdownListener,
        queue_depth: usize,
    ) -> (ConnectionReader, ConnectionHandle, JoinHandle<()>) {
        let (read_half, write_half): (OwnedReadHalf, OwnedWriteHalf) = self.stream.into_split();
        let (handle, writer) = spawn_writer(write_half, shutdown, queue_depth);
        (ConnectionReader::new(read_half), handle, writer)
    }
}

// ── Read side ─────────────────────────────────────────────────────────────────

/// Read half of the connection.
#[derive(Debug)]
pub struct ConnectionReader<R = OwnedReadHalf> {
    reader: R,
}

impl<R: AsyncRead + Unpin + Send> ConnectionReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns whatever has arrived, up to `max_bytes` (at least one).
    ///
    /// # Errors
    ///
    /// [`GatewayError::Closed`] on EOF, [`GatewayError::Io`] on read errors.
    pub async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, GatewayError> {
        let mut buf = vec![0u8; max_bytes.max(1)];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            return Err(GatewayError::Closed);
        }
        buf.truncate(n);
        debug!(len = n, data = %String::from_utf8_lossy(&buf), "received");
        Ok(buf)
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameSource for ConnectionReader<R> {
    async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, GatewayError> {
        ConnectionReader::receive(self, max_bytes).await
    }
}

// ── Write side ────────────────────────────────────────────────────────────────

/// One queued write and the slot its result goes back through.
#[derive(Debug)]
struct WriteRequest {
    bytes: Vec<u8>,
    reply: oneshot::Sender<io::Result<usize>>,
}

/// Cloneable sender side of the writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<WriteRequest>,
}

impl ConnectionHandle {
    /// Writes `bytes` in full and returns how many were written.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Io`] if the socket write failed,
    /// [`GatewayError::WriterStopped`] if the writer task has exited.
    pub async fn send(&self, bytes: &[u8]) -> Result<usize, GatewayError> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(WriteRequest {
                bytes: bytes.to_vec(),
                reply,
            })
            .await
            .map_err(|_| GatewayError::WriterStopped)?;
        let written = result.await.map_err(|_| GatewayError::WriterStopped)??;
        Ok(written)
    }

    /// Returns `true` once the writer task is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl FrameSink for ConnectionHandle {
    async fn send_frame(&self, frame: Frame) -> Result<usize, GatewayError> {
        self.send(frame.as_bytes()).await
    }
}

/// Spawns the task that owns `writer`.
///
/// A failed write is reported to its caller and the task keeps serving: the
/// gateway never reconnects, so later writes simply fail the same way.
/// Shutdown abandons a write that is still in progress and answers its
/// caller with [`io::ErrorKind::Interrupted`].
pub fn spawn_writer<W>(
    mut writer: W,
    mut shutdown: ShutdownListener,
    queue_depth: usize,
) -> (ConnectionHandle, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<WriteRequest>(queue_depth.max(1));

    let task = tokio::spawn(async move {
        loop {
            let request = tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                request = rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            // A peer that stops reading can park the write forever; shutdown
            // must still get through.
            let result = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    let _ = request.reply.send(Err(io::ErrorKind::Interrupted.into()));
                    break;
                }
                result = write_all_flush(&mut writer, &request.bytes) => result,
            };
            match &result {
                Ok(n) => debug!(len = n, frame = %String::from_utf8_lossy(&request.bytes), "sent"),
                Err(e) => warn!("write failed: {}", e),
            }
            // The caller may have given up waiting; that is not an error here.
            let _ = request.reply.send(result);
        }

        if let Err(e) = writer.shutdown().await {
            debug!("writer shutdown: {}", e);
        }
        debug!("writer task stopped");
    });

    (ConnectionHandle { tx }, task)
}

async fn write_all_flush<W: AsyncWrite + Unpin>(
    writer: &mut W,
    bytes: &[u8],
) -> io::Result<usize> {
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use agv_core::{encode_command, CommandKey};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_receive_returns_available_bytes() {
        // Arrange
        let mock = Builder::new().read(b"\x02FFFAH7000011\x03").build();
        let mut reader = ConnectionReader::new(mock);

        // Act
        let bytes = reader.receive(1024).await.unwrap();

        // Assert
        assert_eq!(bytes, b"\x02FFFAH7000011\x03");
    }

    #[tokio::test]
    async fn test_receive_caps_at_max_bytes() {
        let mock = Builder::new().read(b"0123456789").build();
        let mut reader = ConnectionReader::new(mock);
        assert_eq!(reader.receive(4).await.unwrap(), b"0123");
        assert_eq!(reader.receive(100).await.unwrap(), b"456789");
    }

    #[tokio::test]
    async fn test_receive_reports_eof_as_closed() {
        let mock = Builder::new().build();
        let mut reader = ConnectionReader::new(mock);
        assert!(matches!(reader.receive(1024).await, Err(GatewayError::Closed)));
    }

    #[tokio::test]
    async fn test_receive_surfaces_read_errors() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut reader = ConnectionReader::new(mock);
        assert!(matches!(reader.receive(1024).await, Err(GatewayError::Io(_))));
    }

    #[tokio::test]
    async fn test_send_writes_frame_and_reports_length() {
        // Arrange
        let frame = encode_command(CommandKey::parse(700, '1').unwrap());
        let mock = Builder::new().write(frame.as_bytes()).build();
        let (_trigger, listener) = shutdown_channel();
        let (handle, task) = spawn_writer(mock, listener, DEFAULT_WRITE_QUEUE);

        // Act
        let written = handle.send_frame(frame).await.unwrap();

        // Assert: the mock panics on drop if the expected write never came
        assert_eq!(written, 14);
        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_write_error_is_returned_to_caller_and_writer_keeps_serving() {
        // Arrange
        let mock = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .write(b"second")
            .build();
        let (_trigger, listener) = shutdown_channel();
        let (handle, task) = spawn_writer(mock, listener, DEFAULT_WRITE_QUEUE);

        // Act
        let first = handle.send(b"first").await;
        let second = handle.send(b"second").await;

        // Assert
        assert!(matches!(first, Err(GatewayError::Io(_))));
        assert_eq!(second.unwrap(), 6);
        drop(handle);
        task.await.unwrap();
    }

    /// Accepts nothing, like a socket whose peer stopped reading.
    struct StalledWriter;

    impl AsyncWrite for StalledWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_stuck_write() {
        // Arrange: one write parked on a peer that never drains
        let (trigger, listener) = shutdown_channel();
        let (handle, task) = spawn_writer(StalledWriter, listener, DEFAULT_WRITE_QUEUE);
        let sender = tokio::spawn({
            let handle = handle.clone();
            async move { handle.send(b"\x02AFFFV7000011\x03").await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sender.is_finished(), "write must be stuck before shutdown");

        // Act
        trigger.trigger();

        // Assert: the writer exits and the stuck caller is released
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("writer must stop while a write is stuck")
            .unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), sender)
            .await
            .expect("caller must be released")
            .unwrap();
        match result {
            Err(GatewayError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::Interrupted),
            other => panic!("expected an interrupted write, got {other:?}"),
        }
        assert!(matches!(
            handle.send(b"late").await,
            Err(GatewayError::WriterStopped)
        ));
    }

    #[tokio::test]
    async fn test_send_after_shutdown_reports_writer_stopped() {
        // Arrange
        let mock = Builder::new().build();
        let (trigger, listener) = shutdown_channel();
        let (handle, task) = spawn_writer(mock, listener, DEFAULT_WRITE_QUEUE);

        // Act
        trigger.trigger();
        task.await.unwrap();
        let result = handle.send(b"late").await;

        // Assert
        assert!(matches!(result, Err(GatewayError::WriterStopped)));
        assert!(handle.is_closed());
    }
}

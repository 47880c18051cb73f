//! One-shot TCP acceptor.
//!
//! The gateway serves exactly one controller.  [`Acceptor`] binds the listening
//! socket, waits for the first peer and is then consumed: the listening socket
//! is closed as soon as the connection is established, so a second controller
//! gets "connection refused" instead of a silent queue slot.

use std::net::{IpAddr, SocketAddr};

use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

use crate::error::GatewayError;
use crate::infrastructure::network::connection::Connection;

/// Listen backlog used when none is configured.
pub const DEFAULT_BACKLOG: u32 = 5;

/// A bound, listening socket waiting for its single peer.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    local: SocketAddr,
}

impl Acceptor {
    /// Binds `bind_address:port` and starts listening.
    ///
    /// Port `0` asks the OS for a free port; see [`Acceptor::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BindFailed`] if the socket cannot be created,
    /// bound or put into listen mode (e.g., the port is already in use).
    pub fn bind(bind_address: IpAddr, port: u16, backlog: u32) -> Result<Self, GatewayError> {
        let addr = SocketAddr::new(bind_address, port);
        let bind_failed = |source| GatewayError::BindFailed { addr, source };

        // `TcpSocket` instead of `TcpListener::bind` so the backlog is ours to
        // choose.
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(bind_failed)?;

        // Lets a restarted gateway rebind while the old socket is in TIME_WAIT.
        #[cfg(unix)]
        socket.set_reuseaddr(true).map_err(bind_failed)?;

        socket.bind(addr).map_err(bind_failed)?;
        let listener = socket.listen(backlog).map_err(bind_failed)?;
        let local = listener.local_addr().map_err(bind_failed)?;

        info!(%local, backlog, "listening for controller");
        Ok(Self { listener, local })
    }

    /// The address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Waits for the controller to connect and closes the listener.
    ///
    /// No timeout: this blocks until a peer arrives.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AcceptFailed`] if `accept()` fails.
    pub async fn accept(self, nodelay: bool) -> Result<Connection, GatewayError> {
        let (stream, peer) =
            self.listener
                .accept()
                .await
                .map_err(|source| GatewayError::AcceptFailed {
                    addr: self.local,
                    source,
                })?;

        // Frames are 14 bytes; don't let Nagle hold them back.
        if nodelay {
            stream.set_nodelay(true)?;
        }

        info!(%peer, "connected to controller");
        Ok(Connection::new(stream, peer, self.local))
    }
}

/// Binds with the default backlog and waits for one peer.
///
/// # Errors
///
/// See [`Acceptor::bind`] and [`Acceptor::accept`].
pub async fn accept(bind_address: IpAddr, port: u16) -> Result<Connection, GatewayError> {
    Acceptor::bind(bind_address, port, DEFAULT_BACKLOG)?
        .accept(true)
        .await
}

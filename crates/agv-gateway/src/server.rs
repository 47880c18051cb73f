//! `GatewayServer`: the public face of the gateway.
//!
//! Construction blocks until the controller connects, then starts three
//! background tasks on the connection:
//!
//! ```text
//! GatewayServer::construct()
//!  └─ Acceptor::bind + accept          (waits for the single controller)
//!  └─ Connection::into_split
//!       ├─ writer task                 (owns the write half)
//!       ├─ CommandScheduler::run       (ticks the pending table)
//!       └─ EchoResponder::run          (owns the read half)
//! ```
//!
//! `send_command` goes straight to the writer; `send_command_repeated` only
//! touches the pending table and lets the scheduler do the sending.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use agv_core::{encode_command, CommandKey};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::echo_handshake::{EchoExit, EchoResponder};
use crate::application::schedule_commands::{CommandScheduler, PendingCommands};
use crate::application::shutdown::{shutdown_channel, ShutdownTrigger};
use crate::application::transport::FrameSink;
use crate::error::GatewayError;
use crate::infrastructure::config::GatewayConfig;
use crate::infrastructure::network::{Acceptor, Connection, ConnectionHandle, DEFAULT_WRITE_QUEUE};

/// How the server's background tasks ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Exit reason of the echo responder; `None` if its task panicked.
    pub echo_exit: Option<EchoExit>,
    /// Scheduled sends that never went out.
    pub unsent: u64,
}

/// A running gateway bound to one controller connection.
pub struct GatewayServer {
    peer: SocketAddr,
    local: SocketAddr,
    writer: ConnectionHandle,
    pending: Arc<PendingCommands>,
    shutdown: ShutdownTrigger,
    scheduler_task: JoinHandle<()>,
    echo_task: JoinHandle<EchoExit>,
    writer_task: JoinHandle<()>,
}

impl GatewayServer {
    /// Listens on `bind_address:port`, waits for one peer and starts serving
    /// it with the default settings.
    ///
    /// # Errors
    ///
    /// [`GatewayError::BindFailed`] or [`GatewayError::AcceptFailed`].
    pub async fn construct(bind_address: IpAddr, port: u16) -> Result<Self, GatewayError> {
        let mut config = GatewayConfig::default();
        config.network.bind_address = bind_address;
        config.network.port = port;
        Self::construct_with(&config).await
    }

    /// Like [`construct`](Self::construct), with every setting taken from
    /// `config`.
    pub async fn construct_with(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let acceptor = Acceptor::bind(
            config.network.bind_address,
            config.network.port,
            config.network.backlog,
        )?;
        Self::accept_on(acceptor, config).await
    }

    /// Waits for a peer on an already bound acceptor.
    ///
    /// Useful when binding port `0` and handing the resolved port to the
    /// controller before blocking.
    pub async fn accept_on(
        acceptor: Acceptor,
        config: &GatewayConfig,
    ) -> Result<Self, GatewayError> {
        let connection = acceptor.accept(config.network.nodelay).await?;
        Ok(Self::start(connection, config))
    }

    /// Starts the writer, scheduler and echo responder on `connection`.
    pub fn start(connection: Connection, config: &GatewayConfig) -> Self {
        let peer = connection.peer_addr();
        let local = connection.local_addr();
        let (trigger, echo_shutdown) = shutdown_channel();

        let (reader, writer, writer_task) =
            connection.into_split(trigger.listener(), DEFAULT_WRITE_QUEUE);

        let pending = Arc::new(PendingCommands::new());
        let scheduler = CommandScheduler::new(
            Arc::clone(&pending),
            writer.clone(),
            config.scheduler.tick_interval(),
        );
        let scheduler_task = tokio::spawn(scheduler.run(trigger.listener()));

        let responder =
            EchoResponder::with_buffer_size(reader, writer.clone(), config.network.receive_buffer);
        let echo_task = tokio::spawn(responder.run(echo_shutdown));

        info!(%peer, %local, "gateway serving controller");
        Self {
            peer,
            local,
            writer,
            pending,
            shutdown: trigger,
            scheduler_task,
            echo_task,
            writer_task,
        }
    }

    /// Address of the connected controller.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Encodes and sends one command right away.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidArgument`] before anything is sent if the
    /// arguments cannot be encoded; otherwise any write error.
    pub async fn send_command(&self, target_id: u32, state: char) -> Result<usize, GatewayError> {
        let key = CommandKey::parse(target_id, state)?;
        self.writer.send_frame(encode_command(key)).await
    }

    /// Schedules `n_times` sends of the command, one per scheduler tick.
    ///
    /// Replaces any count already pending for the same `(target_id, state)`;
    /// `n_times == 0` cancels it.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidArgument`] if the arguments cannot be encoded.
    pub fn send_command_repeated(
        &self,
        target_id: u32,
        state: char,
        n_times: u32,
    ) -> Result<(), GatewayError> {
        let key = CommandKey::parse(target_id, state)?;
        let previous = self.pending.schedule(key, n_times);
        debug!(%key, n_times, ?previous, "scheduled command");
        Ok(())
    }

    /// The pending-command table shared with the scheduler.
    pub fn pending(&self) -> &Arc<PendingCommands> {
        &self.pending
    }

    /// `false` once the echo responder has stopped, for any reason.
    pub fn is_echo_running(&self) -> bool {
        !self.echo_task.is_finished()
    }

    /// Stops every background task and waits for them.
    pub async fn shutdown(self) -> ShutdownReport {
        self.shutdown.trigger();

        if let Err(e) = self.scheduler_task.await {
            warn!("scheduler task ended abnormally: {}", e);
        }
        let echo_exit = match self.echo_task.await {
            Ok(exit) => Some(exit),
            Err(e) => {
                warn!("echo responder task ended abnormally: {}", e);
                None
            }
        };
        drop(self.writer);
        if let Err(e) = self.writer_task.await {
            warn!("writer task ended abnormally: {}", e);
        }

        let unsent = self
            .pending
            .snapshot()
            .iter()
            .map(|(_, remaining)| u64::from(*remaining))
            .sum();
        info!(peer = %self.peer, ?echo_exit, unsent, "gateway stopped");
        ShutdownReport { echo_exit, unsent }
    }
}

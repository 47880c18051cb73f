//! Shutdown signal shared by the gateway's background loops.
//!
//! One [`ShutdownTrigger`] fans out to any number of [`ShutdownListener`]s.
//! Listeners also treat a dropped trigger as a shutdown, so the loops never
//! outlive the server that owns them.

use tokio::sync::watch;

/// Owning half: fires the signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Observing half: cheap to clone, one per background loop.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/listener pair.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownListener) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownListener { rx })
}

impl ShutdownTrigger {
    /// Signals every listener.  Calling it more than once is harmless.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Creates another listener for this trigger.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownListener {
    /// Returns `true` once the signal has fired or the trigger was dropped.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves when the signal fires or the trigger is dropped.
    ///
    /// Cancel-safe: it can be raced in `tokio::select!` on every loop
    /// iteration.
    pub async fn triggered(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

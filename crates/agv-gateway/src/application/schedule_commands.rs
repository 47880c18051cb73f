//! Repeated-send scheduler.
//!
//! Callers register `(target, state) -> n` entries in a [`PendingCommands`]
//! table.  A [`CommandScheduler`] wakes up every tick, sends one frame for
//! every entry present at the start of the tick and decrements its count.
//! Entries are removed in the same tick their count reaches zero, so a key
//! is sent exactly `n` times.
//!
//! # Locking
//!
//! The table is a `std::sync::Mutex<BTreeMap<..>>`.  A tick takes all of its
//! decrement decisions in a single critical section and only then sends, so
//! the lock is never held across an `.await` and a slow socket never blocks
//! [`PendingCommands::schedule`].
//!
//! ```text
//!  caller ──schedule()──►┌──────────────────┐
//!                        │ PendingCommands  │◄──begin_tick()── scheduler
//!  caller ──cancel()────►└──────────────────┘        │
//!                                                    ▼
//!                                             FrameSink::send_frame
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agv_core::{encode_command, CommandKey};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::shutdown::ShutdownListener;
use crate::application::transport::FrameSink;

/// Reference cadence of the scheduler.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Table of keys still waiting to be sent and how many sends each has left.
///
/// A stored count is always positive.
#[derive(Debug, Default)]
pub struct PendingCommands {
    entries: Mutex<BTreeMap<CommandKey, u32>>,
}

impl PendingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<CommandKey, u32>> {
        // The map is always left consistent, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the remaining count for `key`, replacing any previous count.
    ///
    /// `n_times == 0` cancels the key.  Returns the count that was replaced.
    pub fn schedule(&self, key: CommandKey, n_times: u32) -> Option<u32> {
        let mut entries = self.lock();
        if n_times == 0 {
            entries.remove(&key)
        } else {
            entries.insert(key, n_times)
        }
    }

    /// Removes `key`, returning the sends it had left.
    pub fn cancel(&self, key: CommandKey) -> Option<u32> {
        self.lock().remove(&key)
    }

    pub fn remaining(&self, key: CommandKey) -> Option<u32> {
        self.lock().get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the table in key order.
    pub fn snapshot(&self) -> Vec<(CommandKey, u32)> {
        self.lock().iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// Claims one send for every entry currently in the table.
    ///
    /// Each count is decremented and exhausted entries are removed, all under
    /// one lock.  Returns the claimed keys with the count left after this
    /// send.
    pub(crate) fn begin_tick(&self) -> Vec<(CommandKey, u32)> {
        let mut entries = self.lock();
        let mut due = Vec::with_capacity(entries.len());
        entries.retain(|key, remaining| {
            *remaining -= 1;
            due.push((*key, *remaining));
            *remaining > 0
        });
        due
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frames written successfully.
    pub sent: usize,
    /// Keys whose send failed this tick (they were still decremented).
    pub failed: usize,
    /// Keys that reached zero and left the table.
    pub completed: usize,
}

/// Periodic task that drains a [`PendingCommands`] table into a sink.
pub struct CommandScheduler<S: FrameSink> {
    pending: Arc<PendingCommands>,
    sink: S,
    interval: Duration,
}

impl<S: FrameSink> CommandScheduler<S> {
    /// Creates a scheduler.  A zero `interval` is raised to one millisecond.
    pub fn new(pending: Arc<PendingCommands>, sink: S, interval: Duration) -> Self {
        Self {
            pending,
            sink,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn pending(&self) -> &Arc<PendingCommands> {
        &self.pending
    }

    /// Runs one tick: one send per pending key.
    ///
    /// A failed send is logged and does not affect the other keys.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        for (key, remaining) in self.pending.begin_tick() {
            if remaining == 0 {
                report.completed += 1;
            }
            match self.sink.send_frame(encode_command(key)).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    warn!(%key, remaining, "scheduled send failed: {}", e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Ticks every `interval` until `shutdown` fires.
    ///
    /// The first tick happens one interval after the call.  Shutdown also
    /// abandons a tick whose sends are still in flight; keys it had already
    /// claimed are not sent.
    pub async fn run(self, mut shutdown: ShutdownListener) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {
                    // A tick stuck on a stalled sink must not hold up shutdown.
                    tokio::select! {
                        biased;
                        _ = shutdown.triggered() => break,
                        report = self.tick() => {
                            if report.sent + report.failed > 0 {
                                debug!(?report, "scheduler tick");
                            }
                        }
                    }
                }
            }
        }

        info!(pending = self.pending.len(), "scheduler stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Consolidated sync poller.
//!
//! One scheduler owns the periodic refresh loop — there is no second timer
//! anywhere in the crate. Manual operations share the reconciler through
//! the same `Arc<Mutex<_>>`; the lock is held for one operation at a time,
//! and the reconciler's sequence guard keeps overlapping initiations
//! deterministic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::reconciler::LeadReconciler;

enum Command {
    ForceSync,
    Stop,
}

/// Handle to the background polling task.
///
/// Dropping the handle without [`stop`](Self::stop) leaves the task
/// running for the life of the runtime; stop it for a clean shutdown.
pub struct SyncScheduler {
    commands: flume::Sender<Command>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Spawn the polling loop, syncing every `interval`.
    #[must_use]
    pub fn start(reconciler: Arc<Mutex<LeadReconciler>>, interval: Duration) -> Self {
        let (tx, rx) = flume::unbounded();
        let task = tokio::spawn(run_loop(reconciler, interval, rx));
        info!(interval_ms = interval.as_millis() as u64, "sync scheduler started");
        Self { commands: tx, task }
    }

    /// Sync now instead of waiting for the next tick.
    pub fn force_sync(&self) {
        if self.commands.send(Command::ForceSync).is_err() {
            warn!("force_sync after scheduler stopped");
        }
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.commands.send(Command::Stop);
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task join failed");
        }
    }
}

async fn run_loop(
    reconciler: Arc<Mutex<LeadReconciler>>,
    interval: Duration,
    commands: flume::Receiver<Command>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; that doubles as the initial load.
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = reconciler.lock().await.sync().await;
                debug!(seq = report.seq, live = report.is_live(), "scheduled sync finished");
            }
            cmd = commands.recv_async() => match cmd {
                Ok(Command::ForceSync) => {
                    let report = reconciler.lock().await.sync().await;
                    debug!(seq = report.seq, live = report.is_live(), "forced sync finished");
                    ticker.reset();
                }
                Ok(Command::Stop) | Err(_) => {
                    info!("sync scheduler stopped");
                    break;
                }
            },
        }
    }
}

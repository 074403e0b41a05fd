//! Reconciler event stream.
//!
//! Rendering layers subscribe here instead of being called inline from the
//! mutation path: every phase change and data mutation is announced, and
//! emission is best-effort — a slow or departed subscriber never blocks or
//! fails a reconciler operation.

use std::sync::Mutex;

use crate::reconciler::SyncPhase;

/// Where a sync's data actually came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncSource {
    /// Fresh rows from the active backing store.
    Live,
    /// Last-known-good snapshot after retries were exhausted.
    Backup,
}

/// Everything observable about the reconciler, as it happens.
#[derive(Clone, Debug, PartialEq)]
pub enum ReconcilerEvent {
    PhaseChanged { phase: SyncPhase },
    SyncStarted { seq: u64 },
    SyncCompleted { seq: u64, count: usize, source: SyncSource },
    SyncFailed { seq: u64, error: String },
    LeadSubmitted { id: String },
    LeadTransitioned { id: String, from: String, to: String },
    NoteAppended { id: String },
    /// A write reached the cache but not the backing store; UI should show
    /// a non-blocking "saved locally" warning.
    WriteLocalOnly { id: String, reason: String },
}

/// Fan-out hub for [`ReconcilerEvent`]s.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<flume::Sender<ReconcilerEvent>>>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber; the receiver sees every event emitted
    /// after this call.
    pub fn subscribe(&self) -> flume::Receiver<ReconcilerEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers
            .lock()
            .expect("event hub poisoned")
            .push(tx);
        rx
    }

    /// Deliver an event to every live subscriber, pruning departed ones.
    pub fn emit(&self, event: ReconcilerEvent) {
        let mut subscribers = self.subscribers.lock().expect("event hub poisoned");
        subscribers.retain(|tx| match tx.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(?event, "dropping disconnected event subscriber");
                false
            }
        });
    }
}

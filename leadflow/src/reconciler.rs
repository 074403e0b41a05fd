//! Lead reconciliation across memory, local and remote tiers.
//!
//! [`LeadReconciler`] is the single ingress/egress point for lead data. It
//! owns the in-memory cache, the active [`BackingStore`], and the
//! last-known-good snapshot, and presents one canonical view regardless of
//! which tier is live. All mutation goes through its public operations;
//! callers never touch the cache directly.
//!
//! # Failure semantics
//!
//! Recoverable conditions are **returned, not thrown**: `sync()` retries
//! with exponential backoff and then degrades to the snapshot, `submit()`
//! and `transition()` keep their optimistic local change and report a
//! [`WriteDisposition::LocalOnly`] when the store does not acknowledge.
//! Nothing in this module's public surface returns `Err` — the phase state
//! machine and the report types carry every outcome.
//!
//! # Phase state machine
//!
//! ```text
//! Idle ──sync()──▶ Loading ──ok──▶ Loaded ◀─────────┐
//!                    │ ▲                            │
//!               fail │ └──────── backoff ──┐        │ sync()
//!                    ▼                     │        │
//!                 Retrying ──exhausted──▶ Error ────┘
//! ```
//!
//! `Loaded` and `Error` are rest states; only an explicit `sync()` call
//! leaves them.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, ReconcilerConfig, RetryPolicy};
use crate::events::{EventHub, ReconcilerEvent, SyncSource};
use crate::lead::{Lead, LeadDraft, LeadEvent};
use crate::normalize::{generate_lead_id, is_lead_row, normalize, parse_amount};
use crate::stores::{BackingStore, SnapshotStore, StoreError, WriteRecord};
use crate::workflow::{SUBMITTED, WorkflowGraph};

/// Component-level sync state. See the module docs for the transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Loading,
    /// Waiting out a backoff before retry `attempt` (1-based).
    Retrying { attempt: u32 },
    Loaded,
    /// Retries exhausted; stable until an explicit `sync()`.
    Error { message: String },
}

/// Result of one `sync()` cycle. Never an `Err`: a failed cycle reports
/// `source: Backup` plus the error message, with the last good data.
#[derive(Clone, Debug)]
pub struct SyncReport {
    pub seq: u64,
    pub leads: Vec<Lead>,
    pub source: SyncSource,
    pub error: Option<String>,
}

impl SyncReport {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.source == SyncSource::Live
    }
}

/// Agent-scoped read filter.
#[derive(Clone, Debug, Default)]
pub struct QueryFilter {
    /// `None`, or the admin sentinel, returns everything.
    pub agent: Option<String>,
}

impl QueryFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_agent(agent: impl Into<String>) -> Self {
        Self {
            agent: Some(agent.into()),
        }
    }
}

/// Filtered view plus the unfiltered cache size.
///
/// Callers need both to tell "there is nothing" apart from "the filter
/// excluded everything" — the explicit diagnostic that replaces the
/// original system's silent show-all fallback.
#[derive(Clone, Debug)]
pub struct QueryView {
    pub leads: Vec<Lead>,
    pub total: usize,
}

impl QueryView {
    /// True when leads exist but the filter matched none of them.
    #[must_use]
    pub fn excluded_all(&self) -> bool {
        self.leads.is_empty() && self.total > 0
    }
}

/// Where a write ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteDisposition {
    /// The backing store acknowledged the write.
    Acknowledged,
    /// Only the cache and snapshot have it; the caller should surface a
    /// "saved locally, not yet confirmed" warning. Never auto-retried.
    LocalOnly { reason: String },
}

impl WriteDisposition {
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, WriteDisposition::Acknowledged)
    }
}

/// Result of `submit()`. The lead always lands locally; `disposition`
/// says whether the backing store confirmed it.
#[derive(Clone, Debug)]
pub struct SubmitReport {
    pub lead: Lead,
    pub disposition: WriteDisposition,
}

impl SubmitReport {
    #[must_use]
    pub fn success(&self) -> bool {
        self.disposition.is_acknowledged()
    }
}

/// Result of `transition()`. `NotFound` and `Invalid` are distinct so a UI
/// can say which happened; both leave the cache untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied {
        from: String,
        to: String,
        disposition: WriteDisposition,
    },
    NotFound,
    Invalid {
        from: String,
        to: String,
    },
}

impl TransitionOutcome {
    /// True when the status change was applied locally (acknowledged or
    /// not).
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

/// Result of `append_note()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteOutcome {
    Applied { disposition: WriteDisposition },
    NotFound,
}

impl NoteOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, NoteOutcome::Applied { .. })
    }
}

/// Single ingress/egress point for lead data. See the module docs.
pub struct LeadReconciler {
    graph: WorkflowGraph,
    store: Arc<dyn BackingStore>,
    snapshot: SnapshotStore,
    cache: Vec<Lead>,
    phase: SyncPhase,
    next_seq: u64,
    applied_seq: u64,
    retry: RetryPolicy,
    admin_sentinel: String,
    events: EventHub,
}

impl LeadReconciler {
    /// Build a reconciler with the store the configuration selects.
    ///
    /// # Errors
    ///
    /// Only invalid configuration fails; see [`ConfigError`].
    pub fn new(config: ReconcilerConfig) -> Result<Self, ConfigError> {
        let store = config.build_store()?;
        Ok(Self::with_store(config, store))
    }

    /// Build a reconciler around an injected store adapter.
    #[must_use]
    pub fn with_store(config: ReconcilerConfig, store: Arc<dyn BackingStore>) -> Self {
        let snapshot = match &config.snapshot_path {
            Some(path) => SnapshotStore::at_path(path.clone()),
            None => SnapshotStore::in_memory(),
        };
        Self {
            graph: WorkflowGraph::standard(),
            store,
            snapshot,
            cache: Vec::new(),
            phase: SyncPhase::Idle,
            next_seq: 0,
            applied_seq: 0,
            retry: config.retry,
            admin_sentinel: config.admin_sentinel,
            events: EventHub::new(),
        }
    }

    /// Swap in a non-standard stage catalog.
    #[must_use]
    pub fn with_graph(mut self, graph: WorkflowGraph) -> Self {
        self.graph = graph;
        self
    }

    /// The stage graph this reconciler validates transitions against.
    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    #[must_use]
    pub fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    /// Subscribe to the reconciler's event stream.
    pub fn subscribe(&self) -> flume::Receiver<ReconcilerEvent> {
        self.events.subscribe()
    }

    /// Fetch, normalize and cache the full lead feed from the active store.
    ///
    /// Retries transient fetch failures with exponential backoff; after the
    /// bound is exhausted the last-known-good snapshot is served instead
    /// and the phase rests at [`SyncPhase::Error`]. Each successful call
    /// **replaces** the cache — repeated syncs never grow it.
    #[instrument(skip(self), fields(store = self.store.describe()))]
    pub async fn sync(&mut self) -> SyncReport {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.set_phase(SyncPhase::Loading);
        self.events.emit(ReconcilerEvent::SyncStarted { seq });

        match self.fetch_with_retry().await {
            Ok(rows) => {
                let leads = dedup_by_id(
                    rows.iter()
                        .filter(|row| is_lead_row(row))
                        .map(normalize)
                        .collect(),
                );
                if self.guard_apply(seq) {
                    self.cache = leads.clone();
                    self.snapshot.save(&self.cache);
                }
                self.set_phase(SyncPhase::Loaded);
                self.events.emit(ReconcilerEvent::SyncCompleted {
                    seq,
                    count: leads.len(),
                    source: SyncSource::Live,
                });
                info!(seq, count = leads.len(), "sync completed");
                SyncReport {
                    seq,
                    leads,
                    source: SyncSource::Live,
                    error: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                if self.cache.is_empty() && self.guard_apply(seq) {
                    self.cache = self.snapshot.load();
                }
                self.set_phase(SyncPhase::Error {
                    message: message.clone(),
                });
                self.events.emit(ReconcilerEvent::SyncFailed {
                    seq,
                    error: message.clone(),
                });
                warn!(seq, error = %message, "sync failed; serving last known good data");
                SyncReport {
                    seq,
                    leads: self.cache.clone(),
                    source: SyncSource::Backup,
                    error: Some(message),
                }
            }
        }
    }

    /// Agent-scoped read over the cache.
    ///
    /// No filter, or the admin sentinel, sees everything; otherwise an
    /// agent sees their own leads plus shared (`System`/unassigned) ones.
    #[must_use]
    pub fn query(&self, filter: &QueryFilter) -> QueryView {
        let total = self.cache.len();
        let agent = filter
            .agent
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case(&self.admin_sentinel));
        let leads = match agent {
            None => self.cache.clone(),
            Some(agent) => self
                .cache
                .iter()
                .filter(|l| l.agent.eq_ignore_ascii_case(agent) || l.is_shared())
                .cloned()
                .collect(),
        };
        let view = QueryView { leads, total };
        if view.excluded_all() {
            warn!(
                agent = agent.unwrap_or_default(),
                total, "agent filter excluded every cached lead"
            );
        }
        view
    }

    /// Create a lead from a capture-form draft.
    ///
    /// The lead is written to the active store *and*, regardless of that
    /// outcome, upserted into the cache and snapshot so the submitting
    /// user sees it immediately.
    #[instrument(skip(self, draft), fields(store = self.store.describe()))]
    pub async fn submit(&mut self, draft: LeadDraft) -> SubmitReport {
        let lead = lead_from_draft(draft);
        let disposition = self
            .attempt_write(&WriteRecord::Create { lead: lead.clone() })
            .await;
        self.upsert(lead.clone());
        self.snapshot.save(&self.cache);
        self.events.emit(ReconcilerEvent::LeadSubmitted {
            id: lead.id.clone(),
        });
        debug!(id = %lead.id, acknowledged = disposition.is_acknowledged(), "lead submitted");
        SubmitReport { lead, disposition }
    }

    /// Move a lead to a new stage.
    ///
    /// Validated against the workflow graph, applied optimistically to the
    /// cache, then propagated best-effort to the active store. A store
    /// failure keeps the local change and reports `LocalOnly`; it is never
    /// reverted or auto-retried.
    #[instrument(skip(self), fields(store = self.store.describe()))]
    pub async fn transition(&mut self, id: &str, new_status: &str) -> TransitionOutcome {
        let Some(index) = self.cache.iter().position(|l| l.id == id) else {
            debug!(id, "transition target not in cache");
            return TransitionOutcome::NotFound;
        };
        let from = self.cache[index].status.clone();
        if !self.graph.is_valid_transition(&from, new_status) {
            debug!(id, %from, to = new_status, "transition rejected by workflow graph");
            return TransitionOutcome::Invalid {
                from,
                to: new_status.to_string(),
            };
        }

        let lead = &mut self.cache[index];
        lead.status = new_status.to_string();
        lead.push_event(LeadEvent::status_change(from.clone(), new_status));
        self.snapshot.save(&self.cache);
        self.events.emit(ReconcilerEvent::LeadTransitioned {
            id: id.to_string(),
            from: from.clone(),
            to: new_status.to_string(),
        });

        let disposition = self
            .attempt_write(&WriteRecord::UpdateStatus {
                id: id.to_string(),
                status: new_status.to_string(),
            })
            .await;
        info!(id, %from, to = new_status, acknowledged = disposition.is_acknowledged(), "lead transitioned");
        TransitionOutcome::Applied {
            from,
            to: new_status.to_string(),
            disposition,
        }
    }

    /// Append a note to a lead's history without losing prior entries.
    #[instrument(skip(self, text), fields(store = self.store.describe()))]
    pub async fn append_note(&mut self, id: &str, text: &str) -> NoteOutcome {
        let Some(lead) = self.cache.iter_mut().find(|l| l.id == id) else {
            return NoteOutcome::NotFound;
        };
        lead.note = text.to_string();
        lead.push_event(LeadEvent::note(text));
        self.snapshot.save(&self.cache);
        self.events.emit(ReconcilerEvent::NoteAppended { id: id.to_string() });

        let disposition = self
            .attempt_write(&WriteRecord::Note {
                id: id.to_string(),
                note: text.to_string(),
            })
            .await;
        NoteOutcome::Applied { disposition }
    }

    async fn fetch_with_retry(&mut self) -> Result<Vec<serde_json::Value>, StoreError> {
        let mut attempt = 0;
        loop {
            match self.store.fetch_all().await {
                Ok(rows) => return Ok(rows),
                Err(e) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_before(attempt);
                    attempt += 1;
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "fetch failed; backing off");
                    self.set_phase(SyncPhase::Retrying { attempt });
                    tokio::time::sleep(delay).await;
                    self.set_phase(SyncPhase::Loading);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt_write(&self, record: &WriteRecord) -> WriteDisposition {
        match self.store.write_record(record).await {
            Ok(()) => WriteDisposition::Acknowledged,
            Err(e) => {
                let reason = e.to_string();
                warn!(id = record.lead_id(), error = %reason, "write not acknowledged; keeping local copy");
                self.events.emit(ReconcilerEvent::WriteLocalOnly {
                    id: record.lead_id().to_string(),
                    reason: reason.clone(),
                });
                WriteDisposition::LocalOnly { reason }
            }
        }
    }

    /// Whether a cycle's result may land in the cache. Protects against a
    /// stale in-flight result overwriting a newer one; last writer wins
    /// deterministically.
    fn guard_apply(&mut self, seq: u64) -> bool {
        if seq < self.applied_seq {
            debug!(seq, applied = self.applied_seq, "ignoring stale sync result");
            return false;
        }
        self.applied_seq = seq;
        true
    }

    fn upsert(&mut self, lead: Lead) {
        match self.cache.iter_mut().find(|l| l.id == lead.id) {
            Some(existing) => *existing = lead,
            None => self.cache.push(lead),
        }
    }

    fn set_phase(&mut self, phase: SyncPhase) {
        if self.phase != phase {
            self.phase = phase.clone();
            self.events.emit(ReconcilerEvent::PhaseChanged { phase });
        }
    }
}

/// Materialize a draft into a canonical lead: fresh id when absent,
/// `Submitted` status, stamped creation time.
fn lead_from_draft(draft: LeadDraft) -> Lead {
    let id = draft
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generate_lead_id);
    let client = if draft.client.trim().is_empty() {
        crate::normalize::UNKNOWN_CLIENT.to_string()
    } else {
        draft.client
    };
    let display = if draft.amount.trim().is_empty() {
        "0".to_string()
    } else {
        draft.amount
    };
    Lead {
        source_record_id: id.clone(),
        client,
        phone: draft.phone,
        amount: crate::lead::Amount::new(parse_amount(&display), display),
        product_type: if draft.product_type.is_empty() {
            crate::normalize::DEFAULT_PRODUCT.to_string()
        } else {
            draft.product_type
        },
        status: SUBMITTED.to_string(),
        agent: if draft.agent.is_empty() {
            Lead::SHARED_AGENT.to_string()
        } else {
            draft.agent
        },
        cibil_score: draft.cibil_score,
        priority: draft.priority,
        note: draft.note,
        created_at: chrono::Utc::now().to_rfc3339(),
        history: Vec::new(),
        id,
    }
}

/// Merge raw-source duplicates: the most recently seen entry for an id
/// wins, first-seen position is kept.
fn dedup_by_id(leads: Vec<Lead>) -> Vec<Lead> {
    let mut index: rustc_hash::FxHashMap<String, usize> = rustc_hash::FxHashMap::default();
    let mut out: Vec<Lead> = Vec::with_capacity(leads.len());
    for lead in leads {
        match index.get(&lead.id) {
            Some(&at) => out[at] = lead,
            None => {
                index.insert(lead.id.clone(), out.len());
                out.push(lead);
            }
        }
    }
    out
}

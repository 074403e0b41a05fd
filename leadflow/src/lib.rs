//! # Leadflow: Lead Pipeline Core
//!
//! Leadflow is the data core of a loan/insurance sales pipeline: a stage
//! **workflow graph** defining the legal lifecycle of a lead, and a
//! **reconciler** that normalizes heterogeneous records from whichever
//! backing store is active and keeps three tiers — in-memory cache, local
//! durable store, remote endpoint — loosely consistent.
//!
//! ## Core Concepts
//!
//! - **Stages**: named lifecycle points with role ownership and
//!   advance/fail/optional edges ([`workflow`])
//! - **Leads**: the one canonical record every source row maps into
//!   ([`lead`], [`normalize`])
//! - **Stores**: interchangeable persistence adapters behind one async
//!   trait ([`stores`])
//! - **Reconciler**: sync/query/submit/transition with optimistic local
//!   writes and structured outcomes ([`reconciler`])
//! - **Events**: an observer stream UI layers subscribe to instead of
//!   being called inline ([`events`])
//!
//! ## Quick Start
//!
//! ```no_run
//! use leadflow::config::ReconcilerConfig;
//! use leadflow::lead::LeadDraft;
//! use leadflow::reconciler::{LeadReconciler, QueryFilter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reconciler = LeadReconciler::new(ReconcilerConfig::from_env())?;
//!
//! // Pull the feed, normalized and deduplicated.
//! let report = reconciler.sync().await;
//! println!("{} leads ({:?})", report.leads.len(), report.source);
//!
//! // Capture a new lead; it is visible locally even if the remote write
//! // is not acknowledged.
//! let submitted = reconciler
//!     .submit(LeadDraft {
//!         client: "Asha Verma".into(),
//!         amount: "1,50,000".into(),
//!         agent: "AGENT_007".into(),
//!         ..Default::default()
//!     })
//!     .await;
//!
//! // Advance it through the workflow.
//! let outcome = reconciler.transition(&submitted.lead.id, "Rejected").await;
//! assert!(outcome.success());
//!
//! // Agent-scoped view, with the filtered-everything diagnostic.
//! let view = reconciler.query(&QueryFilter::for_agent("AGENT_007"));
//! if view.excluded_all() {
//!     eprintln!("{} leads exist but none match the filter", view.total);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`workflow`] - Stage catalog and transition legality
//! - [`lead`] - Canonical record types
//! - [`normalize`] - Raw-row to canonical-lead mapping
//! - [`stores`] - Backing store adapters and the snapshot
//! - [`reconciler`] - The reconciliation engine
//! - [`scheduler`] - The single periodic sync loop
//! - [`events`] - Observer event stream
//! - [`config`] - Environment and builder configuration

pub mod config;
pub mod events;
pub mod lead;
pub mod normalize;
pub mod reconciler;
pub mod scheduler;
pub mod stores;
pub mod workflow;

pub use config::{ReconcilerConfig, RetryPolicy, StoreSelector};
pub use events::{ReconcilerEvent, SyncSource};
pub use lead::{Lead, LeadDraft, Priority};
pub use reconciler::{
    LeadReconciler, NoteOutcome, QueryFilter, QueryView, SubmitReport, SyncPhase, SyncReport,
    TransitionOutcome, WriteDisposition,
};
pub use scheduler::SyncScheduler;
pub use workflow::{Stage, WorkflowGraph};

//! Backing store adapters.
//!
//! The reconciler is agnostic to which persistence tier is active; every
//! tier satisfies the same [`BackingStore`] shape — a whole-feed read side
//! (`fetch_all`) and a record-at-a-time write side (`write_record`).
//!
//! ```text
//!                  ┌───────────────────┐
//!                  │ BackingStore trait │
//!                  │ (async read/write) │
//!                  └─────────┬─────────┘
//!                            │
//!            ┌───────────────┼───────────────┐
//!            ▼               ▼               ▼
//!     ┌────────────┐  ┌────────────┐  ┌────────────┐
//!     │ LocalStore │  │ HttpStore  │  │ MemoryStore│
//!     │ JSON file  │  │ JSON/HTTP  │  │ in-process │
//!     └────────────┘  └────────────┘  └────────────┘
//! ```
//!
//! The last-known-good [`SnapshotStore`] sits outside this trait: it holds
//! canonical leads, not raw rows, and only the reconciler touches it.

pub mod http;
pub mod local;
pub mod memory;
pub mod snapshot;

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lead::Lead;

pub use http::HttpStore;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use snapshot::SnapshotStore;

/// Table name the lead feed lives under in keyed stores.
pub const LEADS_TABLE: &str = "leads";

/// Write-side wire shape, tagged by `action` on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteRecord {
    /// Full lead packet for a new submission.
    Create { lead: Lead },
    /// Status change for an existing lead.
    UpdateStatus { id: String, status: String },
    /// Free-text note appended to an existing lead.
    Note { id: String, note: String },
}

impl WriteRecord {
    /// The lead id this write targets.
    #[must_use]
    pub fn lead_id(&self) -> &str {
        match self {
            WriteRecord::Create { lead } => &lead.id,
            WriteRecord::UpdateStatus { id, .. } | WriteRecord::Note { id, .. } => id,
        }
    }
}

/// Failures raised by store adapters.
///
/// These never cross the reconciler's public API directly; they feed the
/// retry/fallback policy and end up as structured report fields.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("store unreachable: {reason}")]
    #[diagnostic(code(leadflow::store::unavailable))]
    Unavailable { reason: String },

    #[error("store request timed out after {seconds}s")]
    #[diagnostic(code(leadflow::store::timeout))]
    Timeout { seconds: u64 },

    #[error("store responded with HTTP {status}")]
    #[diagnostic(code(leadflow::store::http_status))]
    HttpStatus { status: u16 },

    #[error("store payload is not valid JSON: {source}")]
    #[diagnostic(
        code(leadflow::store::malformed_payload),
        help("The feed must be a JSON array, or an object with a data/leads/records array.")
    )]
    MalformedPayload {
        #[source]
        source: serde_json::Error,
    },

    #[error("store I/O failed: {source}")]
    #[diagnostic(code(leadflow::store::io))]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("write not acknowledged: {reason}")]
    #[diagnostic(code(leadflow::store::not_acknowledged))]
    NotAcknowledged { reason: String },
}

/// A persistence tier the reconciler can read the raw lead feed from and
/// write records to.
///
/// Implementations must be cheap to share (`Arc<dyn BackingStore>`) and must
/// not retry internally — retry policy belongs to the reconciler.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetch every raw row of the lead feed. Rows are arbitrary JSON; the
    /// reconciler filters and normalizes them.
    async fn fetch_all(&self) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Apply one write. `Ok(())` means the store acknowledged it.
    async fn write_record(&self, record: &WriteRecord) -> Result<(), StoreError>;

    /// Short human-readable identity for logs.
    fn describe(&self) -> &str;
}

//! Last-known-good snapshot of the canonical lead cache.
//!
//! Written after every successful sync and read back when a sync exhausts
//! its retries, so a dead upstream degrades to stale data instead of a
//! blank state. Holds canonical [`Lead`]s (unlike the raw-row backing
//! stores) as a JSON array under the `leads` key; memory-only when no path
//! is configured.

use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::lead::Lead;
use crate::stores::LEADS_TABLE;

#[derive(Debug, Default)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
    mem: Vec<Lead>,
}

impl SnapshotStore {
    /// Memory-only snapshot; lost on drop.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed snapshot at `path`.
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            mem: Vec::new(),
        }
    }

    /// Persist the latest good cache. Failures are logged, not surfaced —
    /// the live cache is already correct and a broken snapshot only costs
    /// the next fallback.
    pub fn save(&mut self, leads: &[Lead]) {
        self.mem = leads.to_vec();
        let Some(path) = &self.path else { return };
        let root = serde_json::json!({ LEADS_TABLE: leads });
        let write = std::fs::write(path, serde_json::to_string(&root).unwrap_or_default());
        match write {
            Ok(()) => debug!(path = %path.display(), count = leads.len(), "snapshot saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "snapshot save failed"),
        }
    }

    /// Load the last-known-good leads, preferring the in-memory copy.
    #[must_use]
    pub fn load(&self) -> Vec<Lead> {
        if !self.mem.is_empty() {
            return self.mem.clone();
        }
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(text) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|root| root.get(LEADS_TABLE).cloned())
            .and_then(|rows| serde_json::from_value(rows).ok())
            .unwrap_or_default()
    }
}

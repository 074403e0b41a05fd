//! Canonical lead record types.
//!
//! [`Lead`] is the one shape every raw source row is normalized into and the
//! element type of the persisted snapshot format. It is serde
//! round-trippable; `#[serde(default)]` keeps older snapshots readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested amount: parsed numeric value plus the original display string.
///
/// Source data mixes formatted strings (`"1,50,000"`) and raw numerics; the
/// canonical form keeps both so UI layers never re-parse.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: f64,
    pub display: String,
}

impl Amount {
    #[must_use]
    pub fn new(value: f64, display: impl Into<String>) -> Self {
        Self {
            value,
            display: display.into(),
        }
    }
}

/// Lead handling priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[default]
    Normal,
    Urgent,
    HighNet,
}

impl Priority {
    pub const NORMAL: &'static str = "NORMAL";
    pub const URGENT: &'static str = "URGENT";
    pub const HIGH_NET: &'static str = "HIGH_NET";

    /// Parse a wire string; anything unrecognized is `Normal`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            Self::URGENT => Priority::Urgent,
            Self::HIGH_NET => Priority::HighNet,
            _ => Priority::Normal,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Normal => Self::NORMAL,
            Priority::Urgent => Self::URGENT,
            Priority::HighNet => Self::HIGH_NET,
        };
        write!(f, "{s}")
    }
}

/// A single audit entry in a lead's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeadEvent {
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
    pub kind: LeadEventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LeadEventKind {
    StatusChange { from: String, to: String },
    Note { text: String },
}

impl LeadEvent {
    #[must_use]
    pub fn status_change(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind: LeadEventKind::StatusChange {
                from: from.into(),
                to: to.into(),
            },
        }
    }

    #[must_use]
    pub fn note(text: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind: LeadEventKind::Note { text: text.into() },
        }
    }
}

/// The canonical lead record.
///
/// Created by `submit()` or by normalization re-ingestion; mutated only
/// through the reconciler's operations; never deleted by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Globally unique, assigned at creation, immutable.
    pub id: String,
    pub client: String,
    #[serde(default)]
    pub phone: String,
    pub amount: Amount,
    #[serde(default)]
    pub product_type: String,
    /// A stage code; `Submitted` on creation.
    pub status: String,
    /// Owning agent, or `System`/empty meaning visible to all agents.
    #[serde(default)]
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cibil_score: Option<i64>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub note: String,
    /// Orderable display timestamp (RFC 3339 when generated locally).
    #[serde(default)]
    pub created_at: String,
    /// Opaque id of the raw record this was derived from; dedup key across
    /// sync cycles.
    #[serde(default)]
    pub source_record_id: String,
    #[serde(default)]
    pub history: Vec<LeadEvent>,
}

impl Lead {
    /// Agent value that marks a lead as shared/unassigned.
    pub const SHARED_AGENT: &'static str = "System";

    /// Whether the lead is visible to every agent (unassigned or system-owned).
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.agent.is_empty() || self.agent.eq_ignore_ascii_case(Self::SHARED_AGENT)
    }

    /// Append a history event, preserving all prior entries.
    pub fn push_event(&mut self, event: LeadEvent) {
        self.history.push(event);
    }
}

/// Input to `submit()`: whatever the capture form collected.
///
/// Missing fields take the normalization defaults; a missing id is
/// generated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LeadDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub client: String,
    #[serde(default)]
    pub phone: String,
    /// Raw amount string as typed, formatted or not.
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cibil_score: Option<i64>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub note: String,
}

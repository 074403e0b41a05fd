//! Shared fixtures: raw rows in the shapes real sources emit, and
//! reconcilers wired to scriptable stores.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use leadflow::config::{ReconcilerConfig, RetryPolicy};
use leadflow::reconciler::LeadReconciler;

use super::stores::TestStore;

/// Backoff fast enough for tests while keeping the attempt count real.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
    }
}

pub fn test_config() -> ReconcilerConfig {
    ReconcilerConfig::default().with_retry(fast_retry())
}

/// Reconciler over a [`TestStore`] seeded with `rows`.
pub fn reconciler_with_rows(rows: Vec<Value>) -> (LeadReconciler, Arc<TestStore>) {
    let store = Arc::new(TestStore::with_rows(rows));
    let reconciler = LeadReconciler::with_store(test_config(), store.clone());
    (reconciler, store)
}

/// A row the way the Google-Sheets-style feed spells it.
pub fn sheet_row(id: &str, client: &str, agent: &str) -> Value {
    json!({
        "Lead ID": id,
        "Customer Name": client,
        "loan_amount": "₹5,00,000",
        "application_status": "Submitted",
        "Agent ID": agent,
        "Mobile No": "9876500000",
        "Category": "BL",
    })
}

/// A row the way the in-browser SQL table spells it.
pub fn sql_row(id: &str, client: &str, status: &str, agent: &str) -> Value {
    json!({
        "id": id,
        "client": client,
        "amount": "5000000",
        "status": status,
        "agent": agent,
        "type": "LAP",
        "cibil": "750",
        "date": "2026-01-15",
        "notes": "seeded",
    })
}

/// A row the way the REST backend spells it.
pub fn backend_row(id: &str, client: &str) -> Value {
    json!({
        "lead_id": id,
        "name": client,
        "requested_amount": 2500000,
        "current_status": "Credit_Review",
        "sourced_by": "AGENT_002",
        "credit_score": 810,
        "priority": "URGENT",
    })
}

/// An administrative payload that shares the feed but is not a lead.
pub fn chat_row() -> Value {
    json!({
        "type": "CHAT",
        "id": "C-001",
        "message": "client called back",
    })
}

pub fn log_row() -> Value {
    json!({
        "TYPE": "LOG",
        "id": "LOG-77",
        "detail": "status sweep",
    })
}

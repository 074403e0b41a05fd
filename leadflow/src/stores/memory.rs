//! In-process store, for demos and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{BackingStore, StoreError, WriteRecord};

/// A [`BackingStore`] holding its rows in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a seeded feed.
    #[must_use]
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Replace the feed wholesale (simulates upstream churn in tests).
    pub fn set_rows(&self, rows: Vec<Value>) {
        *self.rows.lock().expect("memory store poisoned") = rows;
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.rows.lock().expect("memory store poisoned").clone())
    }

    async fn write_record(&self, record: &WriteRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("memory store poisoned");
        match record {
            WriteRecord::Create { lead } => {
                rows.push(serde_json::to_value(lead).unwrap_or(Value::Null));
                Ok(())
            }
            WriteRecord::UpdateStatus { id, status } => {
                apply(&mut rows, id, "status", json!(status))
            }
            WriteRecord::Note { id, note } => apply(&mut rows, id, "note", json!(note)),
        }
    }

    fn describe(&self) -> &str {
        "memory"
    }
}

fn apply(rows: &mut [Value], id: &str, field: &str, value: Value) -> Result<(), StoreError> {
    for row in rows.iter_mut() {
        if row.get("id").and_then(Value::as_str) == Some(id)
            && let Some(map) = row.as_object_mut()
        {
            map.insert(field.to_string(), value);
            return Ok(());
        }
    }
    Err(StoreError::NotAcknowledged {
        reason: format!("no record with id {id}"),
    })
}

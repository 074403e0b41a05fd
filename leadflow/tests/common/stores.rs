//! Scriptable store doubles for reconciler tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use leadflow::stores::{BackingStore, StoreError, WriteRecord};

/// A [`BackingStore`] whose fetch/write behavior can be toggled mid-test.
#[derive(Debug, Default)]
pub struct TestStore {
    rows: Mutex<Vec<Value>>,
    fail_fetch: AtomicBool,
    fail_writes: AtomicBool,
    fetch_count: AtomicU32,
}

impl TestStore {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn set_rows(&self, rows: Vec<Value>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackingStore for TestStore {
    async fn fetch_all(&self) -> Result<Vec<Value>, StoreError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "scripted outage".to_string(),
            });
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn write_record(&self, record: &WriteRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::NotAcknowledged {
                reason: "scripted write failure".to_string(),
            });
        }
        let mut rows = self.rows.lock().unwrap();
        match record {
            WriteRecord::Create { lead } => {
                rows.push(serde_json::to_value(lead).unwrap());
            }
            WriteRecord::UpdateStatus { id, status } => {
                update_field(&mut rows, id, "status", json!(status))?;
            }
            WriteRecord::Note { id, note } => {
                update_field(&mut rows, id, "note", json!(note))?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> &str {
        "test"
    }
}

fn update_field(rows: &mut [Value], id: &str, field: &str, value: Value) -> Result<(), StoreError> {
    for row in rows.iter_mut() {
        if row.get("id").and_then(Value::as_str) == Some(id) {
            row.as_object_mut().unwrap().insert(field.to_string(), value);
            return Ok(());
        }
    }
    Err(StoreError::NotAcknowledged {
        reason: format!("no record with id {id}"),
    })
}

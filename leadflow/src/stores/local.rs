//! Local durable store: named whole-array tables in one JSON file.
//!
//! The persisted shape is `{"leads": [ ... ]}` — an array of records keyed
//! by an opaque table name, read and written as a whole. No partial or
//! streaming update contract; every mutation rewrites the file.

use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::debug;

use async_trait::async_trait;

use super::{BackingStore, LEADS_TABLE, StoreError, WriteRecord};

/// File-backed store of named JSON tables.
#[derive(Clone, Debug)]
pub struct LocalStore {
    path: PathBuf,
    label: String,
}

impl LocalStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("local:{}", path.display());
        Self { path, label }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one table as a whole array; a missing file or table is empty.
    pub fn read_table(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        let root: Value =
            serde_json::from_str(&text).map_err(|source| StoreError::MalformedPayload { source })?;
        let rows = root
            .get(table)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows)
    }

    /// Replace one table wholesale, keeping the file's other tables intact.
    pub fn write_table(&self, table: &str, rows: &[Value]) -> Result<(), StoreError> {
        let mut root = if self.path.exists() {
            let text = std::fs::read_to_string(&self.path)?;
            serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default()
        } else {
            Map::new()
        };
        root.insert(table.to_string(), Value::Array(rows.to_vec()));
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default())?;
        debug!(table, rows = rows.len(), path = %self.path.display(), "table written");
        Ok(())
    }

    fn update_row(
        &self,
        id: &str,
        apply: impl Fn(&mut Map<String, Value>),
    ) -> Result<(), StoreError> {
        let mut rows = self.read_table(LEADS_TABLE)?;
        let mut found = false;
        for row in rows.iter_mut() {
            let matches = row.get("id").and_then(Value::as_str) == Some(id);
            if matches && let Some(map) = row.as_object_mut() {
                apply(map);
                found = true;
            }
        }
        if !found {
            return Err(StoreError::NotAcknowledged {
                reason: format!("no record with id {id}"),
            });
        }
        self.write_table(LEADS_TABLE, &rows)
    }
}

#[async_trait]
impl BackingStore for LocalStore {
    async fn fetch_all(&self) -> Result<Vec<Value>, StoreError> {
        self.read_table(LEADS_TABLE)
    }

    async fn write_record(&self, record: &WriteRecord) -> Result<(), StoreError> {
        match record {
            WriteRecord::Create { lead } => {
                let mut rows = self.read_table(LEADS_TABLE)?;
                rows.push(serde_json::to_value(lead).unwrap_or(Value::Null));
                self.write_table(LEADS_TABLE, &rows)
            }
            WriteRecord::UpdateStatus { id, status } => self.update_row(id, |map| {
                map.insert("status".to_string(), json!(status));
            }),
            WriteRecord::Note { id, note } => self.update_row(id, |map| {
                map.insert("note".to_string(), json!(note));
            }),
        }
    }

    fn describe(&self) -> &str {
        &self.label
    }
}

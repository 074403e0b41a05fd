//! Remote store: plain JSON-over-HTTP, GET for reads, POST for writes.
//!
//! The read side tolerates every feed envelope seen in the wild — a bare
//! array, or an object wrapping the array under `data`, `leads`, or
//! `records`. Requests carry a bounded timeout; a timed-out fetch follows
//! the same fallback path as any other network failure.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{BackingStore, StoreError, WriteRecord};

/// Default bound on any single remote request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-over-HTTP backing store.
#[derive(Clone, Debug)]
pub struct HttpStore {
    client: reqwest::Client,
    url: String,
    label: String,
    timeout: Duration,
}

impl HttpStore {
    /// Create a store against `url` with the default 10 s request timeout.
    pub fn new(url: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable {
                reason: e.to_string(),
            })?;
        let label = format!("remote:{url}");
        Ok(Self {
            client,
            url,
            label,
            timeout,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            StoreError::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

/// Unwrap whichever envelope the feed uses.
fn extract_rows(payload: Value) -> Vec<Value> {
    if let Value::Array(rows) = payload {
        return rows;
    }
    for key in ["data", "leads", "records"] {
        if let Some(rows) = payload.get(key).and_then(Value::as_array) {
            return rows.clone();
        }
    }
    Vec::new()
}

#[async_trait]
impl BackingStore for HttpStore {
    async fn fetch_all(&self) -> Result<Vec<Value>, StoreError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::HttpStatus {
                status: status.as_u16(),
            });
        }
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let payload: Value =
            serde_json::from_str(&text).map_err(|source| StoreError::MalformedPayload { source })?;
        let rows = extract_rows(payload);
        debug!(url = %self.url, rows = rows.len(), "feed fetched");
        Ok(rows)
    }

    async fn write_record(&self, record: &WriteRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::NotAcknowledged {
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        Ok(())
    }

    fn describe(&self) -> &str {
        &self.label
    }
}

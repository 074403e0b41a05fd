//! Reconciler configuration.
//!
//! Exactly one backing store is active at a time; the selector mirrors the
//! original deployment convention where the store URL field doubles as a
//! mode switch (the literal `LOCAL_DB` selects the local file store,
//! anything else is a remote endpoint).

use miette::Diagnostic;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::stores::{BackingStore, HttpStore, LocalStore, http};

/// Env value of `LEADFLOW_STORE_URL` that selects the local store.
pub const LOCAL_DB_SENTINEL: &str = "LOCAL_DB";

/// Default local database file.
pub const DEFAULT_LOCAL_PATH: &str = "leadflow_db.json";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("remote store URL is empty")]
    #[diagnostic(
        code(leadflow::config::empty_url),
        help("Set LEADFLOW_STORE_URL to an http(s) endpoint, or to LOCAL_DB for the file store.")
    )]
    EmptyRemoteUrl,

    #[error("could not build HTTP client: {reason}")]
    #[diagnostic(code(leadflow::config::http_client))]
    HttpClient { reason: String },
}

/// Which persistence tier is authoritative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreSelector {
    Local { path: PathBuf },
    Remote { url: String },
}

/// Bounded retry with exponential backoff for `sync()` fetches.
///
/// One initial attempt plus up to `max_retries` retries, sleeping
/// `base_delay * 2^n` before retry `n` — 1 s / 2 s / 4 s at the defaults.
/// Write operations are never retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry attempt `n` (zero-based).
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    pub store: StoreSelector,
    /// Last-known-good location; memory-only when absent.
    pub snapshot_path: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub fetch_timeout: Duration,
    pub poll_interval: Duration,
    /// Agent filter value that means "show everything".
    pub admin_sentinel: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            store: StoreSelector::Local {
                path: PathBuf::from(DEFAULT_LOCAL_PATH),
            },
            snapshot_path: None,
            retry: RetryPolicy::default(),
            fetch_timeout: http::DEFAULT_TIMEOUT,
            poll_interval: Duration::from_secs(30),
            admin_sentinel: "ADMIN".to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// Resolve configuration from the environment (via `dotenvy`).
    ///
    /// Reads `LEADFLOW_STORE_URL` (`LOCAL_DB` or an endpoint),
    /// `LEADFLOW_LOCAL_PATH`, `LEADFLOW_SNAPSHOT_PATH`, and
    /// `LEADFLOW_POLL_SECS`; anything unset keeps its default.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(url) = std::env::var("LEADFLOW_STORE_URL") {
            config.store = if url == LOCAL_DB_SENTINEL {
                let path = std::env::var("LEADFLOW_LOCAL_PATH")
                    .unwrap_or_else(|_| DEFAULT_LOCAL_PATH.to_string());
                StoreSelector::Local { path: path.into() }
            } else {
                StoreSelector::Remote { url }
            };
        }
        if let Ok(path) = std::env::var("LEADFLOW_SNAPSHOT_PATH") {
            config.snapshot_path = Some(path.into());
        }
        if let Ok(secs) = std::env::var("LEADFLOW_POLL_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            config.poll_interval = Duration::from_secs(secs);
        }
        config
    }

    #[must_use]
    pub fn with_store(mut self, store: StoreSelector) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Instantiate the configured backing store adapter.
    ///
    /// # Errors
    ///
    /// Invalid configuration is the one failure the crate raises rather
    /// than absorbs.
    pub fn build_store(&self) -> Result<Arc<dyn BackingStore>, ConfigError> {
        match &self.store {
            StoreSelector::Local { path } => Ok(Arc::new(LocalStore::new(path.clone()))),
            StoreSelector::Remote { url } => {
                if url.trim().is_empty() {
                    return Err(ConfigError::EmptyRemoteUrl);
                }
                let store = HttpStore::with_timeout(url.clone(), self.fetch_timeout)
                    .map_err(|e| ConfigError::HttpClient {
                        reason: e.to_string(),
                    })?;
                Ok(Arc::new(store))
            }
        }
    }
}

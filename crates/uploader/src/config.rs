//! Uploader configuration.
//!
//! Configuration is stored as TOML. Every field has a default, so an empty
//! file (or no file at all) yields a working setup against a local backend.

use std::path::Path;
use std::time::Duration;

use recording_transfer::{
    DEFAULT_CHUNK_SIZE, DIRECT_MIN_THROUGHPUT_BYTES_PER_MS, DIRECT_MIN_TIMEOUT, RetryPolicy,
    StrategyKind,
};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Base URL of the recording backend API.
    pub api_base_url: String,

    /// Bearer token for backend calls. Never sent to object storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Segment size of the chunked strategy, in bytes.
    pub chunk_size: usize,

    /// Strategies in the order they are tried.
    pub strategies: Vec<StrategyKind>,

    pub acquire_retry: RetryPolicy,
    pub confirm_retry: RetryPolicy,
    pub chunk_retry: RetryPolicy,

    pub direct_min_timeout_ms: u64,
    pub direct_min_throughput_bytes_per_ms: u64,

    /// Timeout of a single ranged PUT.
    pub chunk_timeout_ms: u64,

    /// Timeout of backend API calls.
    pub request_timeout_ms: u64,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            auth_token: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            strategies: StrategyKind::DEFAULT_ORDER.to_vec(),
            acquire_retry: RetryPolicy::default(),
            confirm_retry: RetryPolicy::default(),
            chunk_retry: RetryPolicy::default(),
            direct_min_timeout_ms: DIRECT_MIN_TIMEOUT.as_millis() as u64,
            direct_min_throughput_bytes_per_ms: DIRECT_MIN_THROUGHPUT_BYTES_PER_MS,
            chunk_timeout_ms: 120_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl UploaderConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, UploadError> {
        let config: UploaderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, UploadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Rejects settings the upload flow cannot run with.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.api_base_url.trim().is_empty() {
            return Err(UploadError::Config("api_base_url is empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(UploadError::Config("chunk_size must be positive".into()));
        }
        if self.strategies.is_empty() {
            return Err(UploadError::Config("at least one strategy is required".into()));
        }
        for (name, policy) in [
            ("acquire_retry", &self.acquire_retry),
            ("confirm_retry", &self.confirm_retry),
            ("chunk_retry", &self.chunk_retry),
        ] {
            if policy.max_attempts == 0 {
                return Err(UploadError::Config(format!(
                    "{name}.max_attempts must be at least 1"
                )));
            }
        }
        Ok(())
    }

    pub fn direct_min_timeout(&self) -> Duration {
        Duration::from_millis(self.direct_min_timeout_ms)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

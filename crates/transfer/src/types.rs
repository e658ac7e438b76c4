use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A locally captured recording waiting to be uploaded.
///
/// `data` is reference counted, so cloning a recording or slicing a chunk
/// out of it never copies the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub data: Bytes,
    pub content_type: String,
    /// Capture time in epoch milliseconds, as sent to the backend.
    pub timestamp: String,
}

impl Recording {
    /// Wraps captured bytes, stamping them with the current time.
    pub fn new(data: impl Into<Bytes>, content_type: &str) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            timestamp: chrono::Utc::now().timestamp_millis().to_string(),
        }
    }

    /// Overrides the capture timestamp.
    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Identifies a transfer strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Direct,
    Chunked,
    Multipart,
}

impl StrategyKind {
    /// Default escalation order: simplest first.
    pub const DEFAULT_ORDER: [StrategyKind; 3] = [
        StrategyKind::Direct,
        StrategyKind::Chunked,
        StrategyKind::Multipart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Chunked => "chunked",
            StrategyKind::Multipart => "multipart",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous byte range of a recording sent as one ranged PUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: usize,
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
    /// Size of the whole recording.
    pub total: u64,
}

impl ChunkSpan {
    /// Number of bytes in the span (never zero).
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value of the `Content-Range` header for this span.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Figures reported by a strategy that delivered every byte.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferStats {
    pub strategy: StrategyKind,
    pub bytes: u64,
    pub elapsed: Duration,
    /// Bytes per second over the whole transfer, if any time elapsed.
    pub average_speed: Option<f64>,
}

impl TransferStats {
    pub fn new(strategy: StrategyKind, bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let average_speed = (secs > 0.0).then(|| bytes as f64 / secs);
        Self {
            strategy,
            bytes,
            elapsed,
            average_speed,
        }
    }
}

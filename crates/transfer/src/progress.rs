use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::types::{StrategyKind, TransferStats};

/// Snapshot of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: u64,
    /// Whole percent, 0-100.
    pub percentage: u8,
    /// Bytes per second since the previous sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Seconds remaining at the current speed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,
}

impl TransferProgress {
    /// The `{0, 0, 0}` state every attempt starts from.
    pub fn zero() -> Self {
        Self {
            loaded: 0,
            total: 0,
            percentage: 0,
            speed: None,
            eta: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded >= self.total
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::zero()
    }
}

/// Computes progress, instantaneous speed and ETA from two byte samples.
///
/// Timestamps are milliseconds on any monotonic clock. Speed is zero when no
/// time elapsed or the byte counter went backwards; ETA is only known while
/// speed is positive.
pub fn compute_progress(
    loaded: u64,
    total: u64,
    prev_loaded: u64,
    prev_timestamp_ms: u64,
    now_ms: u64,
) -> TransferProgress {
    let elapsed_ms = now_ms.saturating_sub(prev_timestamp_ms);
    let speed = if elapsed_ms == 0 {
        0.0
    } else {
        loaded.saturating_sub(prev_loaded) as f64 / (elapsed_ms as f64 / 1000.0)
    };
    let eta = (speed > 0.0).then(|| total.saturating_sub(loaded) as f64 / speed);

    let percentage = if total == 0 {
        0
    } else {
        (loaded as f64 / total as f64 * 100.0).round().clamp(0.0, 100.0) as u8
    };

    TransferProgress {
        loaded,
        total,
        percentage,
        speed: Some(speed),
        eta,
    }
}

// ---------------------------------------------------------------------------
// ProgressMeter
// ---------------------------------------------------------------------------

/// Feeds byte counters of one attempt into [`compute_progress`].
///
/// Remembers the previous sample and never lets `loaded` go backwards.
pub struct ProgressMeter {
    total: u64,
    origin: Instant,
    inner: Mutex<MeterInner>,
}

struct MeterInner {
    prev_loaded: u64,
    prev_ms: u64,
}

impl ProgressMeter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            origin: Instant::now(),
            inner: Mutex::new(MeterInner {
                prev_loaded: 0,
                prev_ms: 0,
            }),
        }
    }

    /// Records that `loaded` bytes have been sent so far.
    pub fn update(&self, loaded: u64) -> TransferProgress {
        let now_ms = self.origin.elapsed().as_millis() as u64;
        let mut s = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let loaded = loaded.clamp(s.prev_loaded, self.total);
        let progress = compute_progress(loaded, self.total, s.prev_loaded, s.prev_ms, now_ms);
        s.prev_loaded = loaded;
        s.prev_ms = now_ms;
        progress
    }

    /// Reports every byte as delivered.
    pub fn complete(&self) -> TransferProgress {
        self.update(self.total)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

// ---------------------------------------------------------------------------
// TransferMetrics
// ---------------------------------------------------------------------------

/// Bookkeeping for one logical upload.
///
/// Survives strategy fallbacks; a user-initiated retry starts a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferMetrics {
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Orchestrator runs; retries inside a strategy are not counted.
    pub attempts: u32,
    pub final_size: u64,
    /// Bytes per second of the strategy that delivered the recording.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
}

impl TransferMetrics {
    pub fn begin(final_size: u64) -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            attempts: 0,
            final_size,
            average_speed: None,
            strategy: None,
        }
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Stores the figures of the strategy that delivered the bytes.
    pub fn record_transfer(&mut self, stats: &TransferStats) {
        self.average_speed = stats.average_speed;
        self.strategy = Some(stats.strategy);
    }

    /// Stamps the end of the upload, whatever its outcome.
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }
}

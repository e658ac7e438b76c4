//! Strategy fallback for the byte transfer.
//!
//! Tries each configured strategy in order against the same target until
//! one succeeds, and stops at once when the upload is cancelled.

use std::sync::Arc;

use recording_protocol::TransferTarget;
use recording_transfer::{
    ChunkedStrategy, DirectStrategy, MultipartStrategy, ProgressFn, PutTransport, Recording,
    StrategyKind, TransferError, TransferMetrics, TransferProgress, TransferStats,
    TransferStrategy,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::UploaderConfig;
use crate::error::UploadError;

/// Runs the transfer strategies of one upload attempt.
pub struct UploadOrchestrator {
    strategies: Vec<Arc<dyn TransferStrategy>>,
    cancel: CancellationToken,
}

impl UploadOrchestrator {
    pub fn new(strategies: Vec<Arc<dyn TransferStrategy>>, cancel: CancellationToken) -> Self {
        Self { strategies, cancel }
    }

    /// Builds the configured strategies on top of `transport`.
    pub fn from_config(
        config: &UploaderConfig,
        transport: Arc<dyn PutTransport>,
        cancel: CancellationToken,
    ) -> Self {
        let direct = DirectStrategy::new(transport.clone()).with_timeout_policy(
            config.direct_min_timeout(),
            config.direct_min_throughput_bytes_per_ms,
        );
        let strategies = config
            .strategies
            .iter()
            .map(|kind| -> Arc<dyn TransferStrategy> {
                match kind {
                    StrategyKind::Direct => Arc::new(direct.clone()),
                    StrategyKind::Chunked => Arc::new(
                        ChunkedStrategy::new(transport.clone())
                            .with_chunk_size(config.chunk_size)
                            .with_retry_policy(config.chunk_retry.clone())
                            .with_chunk_timeout(config.chunk_timeout()),
                    ),
                    StrategyKind::Multipart => Arc::new(MultipartStrategy::new(direct.clone())),
                }
            })
            .collect();
        Self::new(strategies, cancel)
    }

    /// Returns a cancellation token for this attempt.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Strategy order of this orchestrator.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Pushes `recording` to `target`, falling back through the strategies.
    ///
    /// Counts one attempt in `metrics`. Progress restarts at zero for each
    /// strategy. When all strategies fail, the last failure is returned.
    pub async fn run_with_fallback(
        &self,
        recording: &Recording,
        target: &TransferTarget,
        metrics: &mut TransferMetrics,
        on_progress: &ProgressFn<'_>,
    ) -> Result<TransferStats, UploadError> {
        metrics.record_attempt();

        if target.is_expired() {
            warn!(object_key = %target.object_key, "upload URL has expired, trying anyway");
        }

        let mut last_error: Option<TransferError> = None;
        for (position, strategy) in self.strategies.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let kind = strategy.kind();
            if let Some(err) = &last_error {
                warn!(strategy = %kind, previous_error = %err, "falling back to next strategy");
            }
            on_progress(TransferProgress::zero());

            match strategy.run(recording, target, on_progress, &self.cancel).await {
                Ok(stats) => {
                    info!(
                        strategy = %kind,
                        object_key = %target.object_key,
                        bytes = stats.bytes,
                        elapsed_ms = stats.elapsed.as_millis() as u64,
                        "transfer succeeded"
                    );
                    metrics.record_transfer(&stats);
                    return Ok(stats);
                }
                Err(e) if e.is_cancelled() => return Err(UploadError::Cancelled),
                Err(e) => {
                    error!(
                        strategy = %kind,
                        position = position + 1,
                        of = self.strategies.len(),
                        error = %e,
                        "strategy failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(err) => Err(UploadError::Transfer(err)),
            None => Err(UploadError::Config("no transfer strategy configured".into())),
        }
    }
}

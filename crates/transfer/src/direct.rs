use std::sync::Arc;
use std::time::Duration;

use recording_protocol::TransferTarget;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::progress::ProgressMeter;
use crate::strategy::{BoxFuture, ProgressFn, TransferStrategy};
use crate::transport::{PutRequest, PutTransport, put_cancellable};
use crate::types::{Recording, StrategyKind, TransferStats};
use crate::{DIRECT_MIN_THROUGHPUT_BYTES_PER_MS, DIRECT_MIN_TIMEOUT, TransferError};

/// Timeout for a single PUT of `size_bytes`.
///
/// Never below `min_timeout`, and long enough for the whole body at
/// `min_throughput_bytes_per_ms`.
pub fn transfer_timeout(
    size_bytes: u64,
    min_timeout: Duration,
    min_throughput_bytes_per_ms: u64,
) -> Duration {
    let scaled = Duration::from_millis(size_bytes / min_throughput_bytes_per_ms.max(1));
    scaled.max(min_timeout)
}

/// Uploads the whole recording with one streamed PUT.
#[derive(Clone)]
pub struct DirectStrategy {
    transport: Arc<dyn PutTransport>,
    min_timeout: Duration,
    min_throughput_bytes_per_ms: u64,
}

impl DirectStrategy {
    pub fn new(transport: Arc<dyn PutTransport>) -> Self {
        Self {
            transport,
            min_timeout: DIRECT_MIN_TIMEOUT,
            min_throughput_bytes_per_ms: DIRECT_MIN_THROUGHPUT_BYTES_PER_MS,
        }
    }

    /// Overrides the size-scaled timeout parameters.
    pub fn with_timeout_policy(mut self, min_timeout: Duration, min_throughput_bytes_per_ms: u64) -> Self {
        self.min_timeout = min_timeout;
        self.min_throughput_bytes_per_ms = min_throughput_bytes_per_ms;
        self
    }

    /// Performs the PUT, labelling the result with `kind`.
    pub(crate) async fn transfer(
        &self,
        recording: &Recording,
        target: &TransferTarget,
        on_progress: &ProgressFn<'_>,
        cancel: &CancellationToken,
        kind: StrategyKind,
    ) -> Result<TransferStats, TransferError> {
        let total = recording.size();
        let timeout = transfer_timeout(total, self.min_timeout, self.min_throughput_bytes_per_ms);
        debug!(
            object_key = %target.object_key,
            bytes = total,
            timeout_secs = timeout.as_secs(),
            strategy = %kind,
            "starting direct PUT"
        );

        let meter = ProgressMeter::new(total);
        let on_sent = |sent: u64| on_progress(meter.update(sent));
        let request = PutRequest {
            url: target.url.clone(),
            content_type: target.content_type.clone(),
            content_range: None,
            body: recording.data.clone(),
            timeout: Some(timeout),
        };

        let started = Instant::now();
        put_cancellable(self.transport.as_ref(), request, &on_sent, cancel).await?;
        on_progress(meter.complete());

        Ok(TransferStats::new(kind, total, started.elapsed()))
    }
}

impl TransferStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn run<'a>(
        &'a self,
        recording: &'a Recording,
        target: &'a TransferTarget,
        on_progress: &'a ProgressFn<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<TransferStats, TransferError>> {
        Box::pin(self.transfer(recording, target, on_progress, cancel, StrategyKind::Direct))
    }
}

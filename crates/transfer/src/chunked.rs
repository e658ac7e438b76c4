use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use recording_protocol::TransferTarget;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::progress::ProgressMeter;
use crate::retry::{RetryError, RetryPolicy, retry};
use crate::strategy::{BoxFuture, ProgressFn, TransferStrategy};
use crate::transport::{PutRequest, PutTransport, SentFn, put_cancellable};
use crate::types::{ChunkSpan, Recording, StrategyKind, TransferStats};
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Timeout for one ranged PUT.
const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(120);

/// Splits `total` bytes into consecutive spans of `chunk_size`.
///
/// The last span holds the remainder and always ends at `total - 1`.
pub fn plan_chunks(total: u64, chunk_size: usize) -> Result<Vec<ChunkSpan>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize(chunk_size));
    }
    let chunk_size = chunk_size as u64;
    let count = total.div_ceil(chunk_size);

    Ok((0..count)
        .map(|index| {
            let start = index * chunk_size;
            ChunkSpan {
                index: index as usize,
                start,
                end: (start + chunk_size).min(total) - 1,
                total,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// ChunkState
// ---------------------------------------------------------------------------

/// Chunk indices the storage acknowledged for one object.
///
/// Lives in memory for the lifetime of one [`ChunkedStrategy`]; it is never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkState {
    object_key: String,
    acknowledged: BTreeSet<usize>,
}

impl ChunkState {
    pub fn new(object_key: &str) -> Self {
        Self {
            object_key: object_key.into(),
            acknowledged: BTreeSet::new(),
        }
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn acknowledge(&mut self, index: usize) {
        self.acknowledged.insert(index);
    }

    pub fn is_acknowledged(&self, index: usize) -> bool {
        self.acknowledged.contains(&index)
    }

    /// Acknowledged indices in ascending order.
    pub fn acknowledged(&self) -> Vec<usize> {
        self.acknowledged.iter().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// ChunkedStrategy
// ---------------------------------------------------------------------------

/// Uploads a recording as sequential ranged PUTs.
///
/// Chunks go strictly in index order. Each one is retried per the retry
/// policy; when a chunk runs out of attempts the whole strategy fails, but
/// the chunks acknowledged so far are skipped if the same instance is run
/// again for the same object.
pub struct ChunkedStrategy {
    transport: Arc<dyn PutTransport>,
    chunk_size: usize,
    retry: RetryPolicy,
    chunk_timeout: Duration,
    state: Mutex<Option<ChunkState>>,
}

impl ChunkedStrategy {
    pub fn new(transport: Arc<dyn PutTransport>) -> Self {
        Self {
            transport,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            state: Mutex::new(None),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Snapshot of the resume bookkeeping, if any.
    pub fn state(&self) -> Option<ChunkState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forgets all acknowledged chunks.
    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the chunks already acknowledged for `object_key`, starting
    /// fresh bookkeeping when the object changed.
    fn resume_point(&self, object_key: &str) -> BTreeSet<usize> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.as_ref() {
            Some(s) if s.object_key == object_key => s.acknowledged.clone(),
            _ => {
                *state = Some(ChunkState::new(object_key));
                BTreeSet::new()
            }
        }
    }

    fn acknowledge(&self, object_key: &str, index: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .get_or_insert_with(|| ChunkState::new(object_key))
            .acknowledge(index);
    }

    async fn send_chunk(
        &self,
        recording: &Recording,
        target: &TransferTarget,
        span: &ChunkSpan,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let body = recording
            .data
            .slice(span.start as usize..=span.end as usize);
        let range = span.content_range();
        let transport = self.transport.as_ref();
        let ignore_sent = |_: u64| {};
        let on_sent: &SentFn<'_> = &ignore_sent;
        let timeout = self.chunk_timeout;

        let result = retry(&self.retry, cancel, "chunk upload", |attempt| {
            trace!(chunk = span.index, attempt, range = %range, "sending chunk");
            let request = PutRequest {
                url: target.url.clone(),
                content_type: target.content_type.clone(),
                content_range: Some(range.clone()),
                body: body.clone(),
                timeout: Some(timeout),
            };
            put_cancellable(transport, request, on_sent, cancel)
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(RetryError::Cancelled) => Err(TransferError::Cancelled),
            Err(RetryError::Exhausted { attempts, last }) => {
                error!(
                    chunk = span.index,
                    attempts,
                    error = %last,
                    "chunk failed after all retries"
                );
                Err(TransferError::ChunkFailed {
                    index: span.index,
                    attempts,
                    source: Box::new(last),
                })
            }
        }
    }

    async fn transfer(
        &self,
        recording: &Recording,
        target: &TransferTarget,
        on_progress: &ProgressFn<'_>,
        cancel: &CancellationToken,
    ) -> Result<TransferStats, TransferError> {
        let total = recording.size();
        let plan = plan_chunks(total, self.chunk_size)?;
        let resumed = self.resume_point(&target.object_key);
        if resumed.is_empty() {
            debug!(
                object_key = %target.object_key,
                chunks = plan.len(),
                chunk_size = self.chunk_size,
                "starting chunked upload"
            );
        } else {
            info!(
                object_key = %target.object_key,
                acknowledged = resumed.len(),
                chunks = plan.len(),
                "resuming chunked upload"
            );
        }

        let meter = ProgressMeter::new(total);
        let chunk_size = self.chunk_size as u64;
        let started = Instant::now();
        let mut done: u64 = 0;

        for span in &plan {
            if cancel.is_cancelled() {
                self.reset();
                return Err(TransferError::Cancelled);
            }

            if resumed.contains(&span.index) {
                trace!(chunk = span.index, "already acknowledged, skipping");
            } else {
                if let Err(e) = self.send_chunk(recording, target, span, cancel).await {
                    if e.is_cancelled() {
                        self.reset();
                    }
                    return Err(e);
                }
                self.acknowledge(&target.object_key, span.index);
            }

            done += 1;
            on_progress(meter.update((done * chunk_size).min(total)));
        }

        self.reset();
        Ok(TransferStats::new(
            StrategyKind::Chunked,
            total,
            started.elapsed(),
        ))
    }
}

impl TransferStrategy for ChunkedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Chunked
    }

    fn run<'a>(
        &'a self,
        recording: &'a Recording,
        target: &'a TransferTarget,
        on_progress: &'a ProgressFn<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<TransferStats, TransferError>> {
        Box::pin(self.transfer(recording, target, on_progress, cancel))
    }
}

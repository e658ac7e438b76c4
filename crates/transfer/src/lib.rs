//! Byte transfer of interview recordings to pre-signed object storage URLs.
//!
//! Three interchangeable strategies push the bytes:
//!
//! 1. **Direct**: one streamed PUT of the whole recording
//! 2. **Chunked**: sequential ranged PUTs with per-chunk retry and resume
//! 3. **Multipart**: reserved for native multipart uploads, currently Direct
//!
//! All of them report [`TransferProgress`] through a synchronous callback
//! and stop when the shared cancellation token fires.

mod chunked;
mod direct;
mod http;
mod multipart;
mod progress;
mod retry;
mod strategy;
#[cfg(test)]
mod testing;
mod transport;
mod types;

use std::time::Duration;

pub use chunked::{ChunkState, ChunkedStrategy, plan_chunks};
pub use direct::{DirectStrategy, transfer_timeout};
pub use http::HttpTransport;
pub use multipart::MultipartStrategy;
pub use progress::{ProgressMeter, TransferMetrics, TransferProgress, compute_progress};
pub use retry::{RetryError, RetryPolicy, retry};
pub use strategy::{BoxFuture, ProgressFn, TransferStrategy};
pub use transport::{PutRequest, PutTransport, SentFn, put_cancellable};
pub use types::{ChunkSpan, Recording, StrategyKind, TransferStats};

/// Default chunk size for the chunked strategy: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Floor for the direct PUT timeout.
pub const DIRECT_MIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Sustained throughput assumed when scaling the direct PUT timeout (1 byte/ms, ~1 KB/s).
pub const DIRECT_MIN_THROUGHPUT_BYTES_PER_MS: u64 = 1;

/// Errors produced while pushing bytes to object storage.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("chunk {index} failed after {attempts} attempts: {source}")]
    ChunkFailed {
        index: usize,
        attempts: u32,
        #[source]
        source: Box<TransferError>,
    },

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    #[error("transport error: {0}")]
    Transport(String),
}

impl TransferError {
    /// Returns `true` if the transfer stopped because of user cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}

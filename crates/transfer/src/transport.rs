//! The PUT seam between strategies and the network.

use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::TransferError;
use crate::strategy::BoxFuture;

/// Callback receiving the number of body bytes handed to the connection so far.
pub type SentFn<'a> = dyn Fn(u64) + Send + Sync + 'a;

/// One PUT against a pre-signed URL.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub url: String,
    pub content_type: String,
    /// `Content-Range` header value, for ranged (chunked) PUTs.
    pub content_range: Option<String>,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

/// Pushes bytes to object storage.
///
/// Implemented over `reqwest` by [`HttpTransport`](crate::HttpTransport);
/// tests swap in scripted mocks. Dropping the returned future must abort
/// the request.
pub trait PutTransport: Send + Sync {
    /// Sends the request and resolves once a 2xx response arrived.
    fn put<'a>(
        &'a self,
        request: PutRequest,
        on_sent: &'a SentFn<'a>,
    ) -> BoxFuture<'a, Result<(), TransferError>>;
}

/// Runs a PUT that is dropped (and therefore aborted) when `cancel` fires.
pub async fn put_cancellable(
    transport: &dyn PutTransport,
    request: PutRequest,
    on_sent: &SentFn<'_>,
    cancel: &CancellationToken,
) -> Result<(), TransferError> {
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("aborting in-flight PUT");
            Err(TransferError::Cancelled)
        }
        result = transport.put(request, on_sent) => result,
    }
}

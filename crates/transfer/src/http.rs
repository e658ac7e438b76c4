//! `reqwest` implementation of [`PutTransport`].

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use tokio::sync::watch;
use tracing::trace;

use crate::TransferError;
use crate::strategy::BoxFuture;
use crate::transport::{PutRequest, PutTransport, SentFn};

/// Body frames handed to the connection; progress is reported per frame.
const FRAME_SIZE: usize = 64 * 1024;

/// PUTs bodies to pre-signed URLs over HTTP(S).
///
/// No default headers are set: the URL carries its own credentials.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransferError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }

    /// Uses an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn frames(body: &Bytes) -> Vec<Bytes> {
    (0..body.len())
        .step_by(FRAME_SIZE)
        .map(|start| body.slice(start..(start + FRAME_SIZE).min(body.len())))
        .collect()
}

impl PutTransport for HttpTransport {
    fn put<'a>(
        &'a self,
        request: PutRequest,
        on_sent: &'a SentFn<'a>,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            let len = request.body.len() as u64;
            let (sent_tx, mut sent_rx) = watch::channel(0u64);
            let stream = futures_util::stream::iter(frames(&request.body)).map(move |frame| {
                sent_tx.send_modify(|sent| *sent += frame.len() as u64);
                Ok::<Bytes, std::io::Error>(frame)
            });

            // Explicit length: pre-signed PUTs reject chunked transfer encoding.
            let mut builder = self
                .http
                .put(&request.url)
                .header(CONTENT_TYPE, &request.content_type)
                .header(CONTENT_LENGTH, len)
                .body(reqwest::Body::wrap_stream(stream));
            if let Some(range) = &request.content_range {
                builder = builder.header(CONTENT_RANGE, range);
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            trace!(bytes = len, range = ?request.content_range, "PUT");
            let send = builder.send();
            tokio::pin!(send);

            let mut streaming = true;
            let result = loop {
                tokio::select! {
                    result = &mut send => break result,
                    changed = sent_rx.changed(), if streaming => match changed {
                        Ok(()) => on_sent(*sent_rx.borrow_and_update()),
                        Err(_) => streaming = false,
                    },
                }
            };

            let resp = result.map_err(|e| match request.timeout {
                Some(timeout) if e.is_timeout() => TransferError::Timeout(timeout),
                _ => TransferError::Http(e),
            })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(TransferError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            on_sent(len);
            Ok(())
        })
    }
}

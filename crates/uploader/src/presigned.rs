//! Acquisition of a pre-signed upload destination.

use std::time::Instant;

use recording_protocol::{PresignedUrlRequest, TransferTarget, UploadContext};
use recording_transfer::{Recording, RetryError, RetryPolicy, retry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backend::RecordingBackend;
use crate::error::{BackendError, UploadError};

/// Asks the backend for a PUT destination for `recording`.
///
/// Every failure is retried the same way: transport errors, non-2xx
/// answers, `success: false` and bodies without a URL.
pub async fn acquire_target(
    backend: &dyn RecordingBackend,
    recording: &Recording,
    context: &UploadContext,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<TransferTarget, UploadError> {
    let request = PresignedUrlRequest::new(
        context,
        &recording.timestamp,
        recording.size(),
        &recording.content_type,
    );
    let request = &request;

    let result = retry(policy, cancel, "presigned url", move |attempt| async move {
        debug!(attempt, job_id = %request.job_id, bytes = request.file_size, "requesting upload URL");
        let resp = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("aborting in-flight upload URL request");
                return Err(BackendError::Cancelled);
            }
            resp = backend.request_presigned_url(request) => resp?,
        };
        if !resp.success || resp.presigned_url.is_empty() {
            let reason = resp
                .message
                .unwrap_or_else(|| "backend did not issue an upload URL".into());
            return Err(BackendError::Rejected(reason));
        }
        Ok::<_, BackendError>(resp)
    })
    .await;

    match result {
        Ok(resp) => {
            let target = TransferTarget::from_response(resp, &recording.content_type, Instant::now());
            info!(
                object_key = %target.object_key,
                bucket = %target.bucket,
                expires_in = target.expires_in,
                "upload URL acquired"
            );
            Ok(target)
        }
        Err(RetryError::Cancelled) => Err(UploadError::Cancelled),
        Err(RetryError::Exhausted { attempts, last }) => {
            error!(attempts, error = %last, "could not obtain upload URL");
            Err(UploadError::Acquisition {
                attempts,
                source: last,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, OBJECT_KEY, PRESIGNED_URL, api_error, context, presigned_response, recording};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn success_on_third_attempt() {
        let backend = MockBackend::ok().with_presign(|i| {
            if i < 2 { Err(api_error(503)) } else { Ok(presigned_response()) }
        });
        let start = tokio::time::Instant::now();

        let target = acquire_target(
            &backend,
            &recording(16),
            &context(),
            &RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(target.url, PRESIGNED_URL);
        assert_eq!(target.object_key, OBJECT_KEY);
        assert_eq!(backend.presign_calls().len(), 3);
        // 1s after the first failure, 2s after the second.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error() {
        let backend = MockBackend::ok().with_presign(|_| Err(api_error(500)));

        let err = acquire_target(
            &backend,
            &recording(16),
            &context(),
            &RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(backend.presign_calls().len(), 3);
        match err {
            UploadError::Acquisition { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, BackendError::Api { status: 500, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_retried() {
        let backend = MockBackend::ok().with_presign(|i| {
            let mut resp = presigned_response();
            if i == 0 {
                resp.success = false;
                resp.message = Some("busy".into());
            } else if i == 1 {
                resp.presigned_url.clear();
            }
            Ok(resp)
        });

        let target = acquire_target(
            &backend,
            &recording(16),
            &context(),
            &RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(target.url, PRESIGNED_URL);
        assert_eq!(backend.presign_calls().len(), 3);
    }

    #[tokio::test]
    async fn request_describes_recording() {
        let backend = MockBackend::ok();
        let mut ctx = context();
        ctx.round_number = Some(4);

        acquire_target(
            &backend,
            &recording(2048),
            &ctx,
            &RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let calls = backend.presign_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].file_size, 2048);
        assert_eq!(calls[0].timestamp, "1700000000000");
        assert_eq!(calls[0].content_type, "video/webm");
        assert_eq!(calls[0].round_number, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff() {
        let backend = MockBackend::ok().with_presign(|_| Err(api_error(503)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = acquire_target(
            &backend,
            &recording(16),
            &context(),
            &RetryPolicy::default(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(backend.presign_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_request_in_flight() {
        let backend = MockBackend::ok().hanging_presign();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = acquire_target(
            &backend,
            &recording(16),
            &context(),
            &RetryPolicy::default(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert!(backend.was_aborted());
        assert_eq!(backend.presign_calls().len(), 1);
    }
}

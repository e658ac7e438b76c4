//! Registration of a stored recording with the backend.

use recording_protocol::{ConfirmUploadRequest, TransferTarget, UploadContext};
use recording_transfer::{Recording, RetryError, RetryPolicy, retry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backend::RecordingBackend;
use crate::error::{BackendError, UploadError};

/// Tells the backend that `target` now holds `recording`.
///
/// When every attempt fails the object stays in storage without a backend
/// record; the error carries its key so it can be reconciled by hand.
pub async fn confirm_upload(
    backend: &dyn RecordingBackend,
    target: &TransferTarget,
    recording: &Recording,
    context: &UploadContext,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<(), UploadError> {
    let request = ConfirmUploadRequest::new(target, context, recording.size());
    let request = &request;

    let result = retry(policy, cancel, "confirm upload", move |attempt| async move {
        debug!(attempt, object_key = %request.object_key, "confirming upload");
        let resp = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("aborting in-flight confirmation");
                return Err(BackendError::Cancelled);
            }
            resp = backend.confirm_upload(request) => resp?,
        };
        if !resp.success {
            let reason = resp
                .message
                .unwrap_or_else(|| "backend refused the confirmation".into());
            return Err(BackendError::Rejected(reason));
        }
        Ok::<_, BackendError>(resp)
    })
    .await;

    match result {
        Ok(resp) => {
            info!(
                object_key = %target.object_key,
                recording_id = resp.recording_id.as_deref().unwrap_or(""),
                "upload confirmed"
            );
            Ok(())
        }
        Err(RetryError::Cancelled) => Err(UploadError::Cancelled),
        Err(RetryError::Exhausted { attempts, last }) => {
            error!(
                object_key = %target.object_key,
                object_url = %target.object_url,
                attempts,
                error = %last,
                "confirmation lost, stored object has no backend record"
            );
            Err(UploadError::Confirmation {
                object_key: target.object_key.clone(),
                attempts,
                source: last,
            })
        }
    }
}

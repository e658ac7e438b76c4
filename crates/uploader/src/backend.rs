//! Recording backend trait.
//!
//! `RecordingBackend` is implemented over HTTP by [`HttpBackend`](crate::HttpBackend).
//! Keeping it a trait lets the upload flow run against scripted mocks.

use recording_protocol::{
    ConfirmUploadRequest, ConfirmUploadResponse, PresignedUrlRequest, PresignedUrlResponse,
};
use recording_transfer::BoxFuture;

use crate::error::BackendError;

/// The two backend calls the upload flow depends on.
pub trait RecordingBackend: Send + Sync {
    /// Requests a pre-signed PUT destination for a recording.
    fn request_presigned_url<'a>(
        &'a self,
        request: &'a PresignedUrlRequest,
    ) -> BoxFuture<'a, Result<PresignedUrlResponse, BackendError>>;

    /// Registers an uploaded object with the backend.
    fn confirm_upload<'a>(
        &'a self,
        request: &'a ConfirmUploadRequest,
    ) -> BoxFuture<'a, Result<ConfirmUploadResponse, BackendError>>;
}

//! Scripted backend and storage used by the unit tests of this crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use recording_protocol::{
    ConfirmUploadRequest, ConfirmUploadResponse, PresignedUrlRequest, PresignedUrlResponse,
    UploadContext,
};
use recording_transfer::{BoxFuture, PutRequest, PutTransport, Recording, SentFn, TransferError};

use crate::backend::RecordingBackend;
use crate::error::BackendError;

pub(crate) const PRESIGNED_URL: &str = "https://bucket.s3.amazonaws.com/rec.webm?X-Amz-Signature=abc";
pub(crate) const OBJECT_KEY: &str = "recordings/j1/c1/rec.webm";

pub(crate) fn context() -> UploadContext {
    UploadContext::new("j1", "c1", "i1")
}

pub(crate) fn recording(size: usize) -> Recording {
    Recording::new(vec![3u8; size], "video/webm").with_timestamp("1700000000000")
}

pub(crate) fn presigned_response() -> PresignedUrlResponse {
    PresignedUrlResponse {
        success: true,
        presigned_url: PRESIGNED_URL.into(),
        object_key: OBJECT_KEY.into(),
        object_url: format!("https://bucket.s3.amazonaws.com/{OBJECT_KEY}"),
        bucket: "bucket".into(),
        region: "us-east-1".into(),
        content_type: "video/webm".into(),
        expires_in: 3600,
        job_id: "j1".into(),
        candidate_id: "c1".into(),
        timestamp: "1700000000000".into(),
        message: None,
    }
}

pub(crate) fn api_error(status: u16) -> BackendError {
    BackendError::Api {
        status,
        body: "injected".into(),
    }
}

pub(crate) fn storage_error(status: u16) -> TransferError {
    TransferError::Status {
        status,
        body: "injected".into(),
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

type PresignFn = Box<dyn Fn(usize) -> Result<PresignedUrlResponse, BackendError> + Send + Sync>;
type ConfirmFn = Box<dyn Fn(usize) -> Result<ConfirmUploadResponse, BackendError> + Send + Sync>;

/// Backend whose answers are chosen per 0-based call index.
pub(crate) struct MockBackend {
    presign: PresignFn,
    confirm: ConfirmFn,
    presign_calls: Mutex<Vec<PresignedUrlRequest>>,
    confirm_calls: Mutex<Vec<ConfirmUploadRequest>>,
    hang_presign: bool,
    hang_confirm: bool,
    aborted: AtomicBool,
}

impl MockBackend {
    pub fn ok() -> Self {
        Self {
            presign: Box::new(|_| Ok(presigned_response())),
            confirm: Box::new(|_| {
                Ok(ConfirmUploadResponse {
                    success: true,
                    message: None,
                    recording_id: Some("rec-1".into()),
                })
            }),
            presign_calls: Mutex::new(Vec::new()),
            confirm_calls: Mutex::new(Vec::new()),
            hang_presign: false,
            hang_confirm: false,
            aborted: AtomicBool::new(false),
        }
    }

    /// URL requests stay in flight until their future is dropped.
    pub fn hanging_presign(mut self) -> Self {
        self.hang_presign = true;
        self
    }

    /// Confirmations stay in flight until their future is dropped.
    pub fn hanging_confirm(mut self) -> Self {
        self.hang_confirm = true;
        self
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn with_presign(
        mut self,
        f: impl Fn(usize) -> Result<PresignedUrlResponse, BackendError> + Send + Sync + 'static,
    ) -> Self {
        self.presign = Box::new(f);
        self
    }

    pub fn with_confirm(
        mut self,
        f: impl Fn(usize) -> Result<ConfirmUploadResponse, BackendError> + Send + Sync + 'static,
    ) -> Self {
        self.confirm = Box::new(f);
        self
    }

    pub fn presign_calls(&self) -> Vec<PresignedUrlRequest> {
        self.presign_calls.lock().unwrap().clone()
    }

    pub fn confirm_calls(&self) -> Vec<ConfirmUploadRequest> {
        self.confirm_calls.lock().unwrap().clone()
    }
}

impl RecordingBackend for MockBackend {
    fn request_presigned_url<'a>(
        &'a self,
        request: &'a PresignedUrlRequest,
    ) -> BoxFuture<'a, Result<PresignedUrlResponse, BackendError>> {
        Box::pin(async move {
            let index = {
                let mut calls = self.presign_calls.lock().unwrap();
                calls.push(request.clone());
                calls.len() - 1
            };
            if self.hang_presign {
                let _flag = AbortFlag(&self.aborted);
                std::future::pending::<()>().await;
            }
            (self.presign)(index)
        })
    }

    fn confirm_upload<'a>(
        &'a self,
        request: &'a ConfirmUploadRequest,
    ) -> BoxFuture<'a, Result<ConfirmUploadResponse, BackendError>> {
        Box::pin(async move {
            let index = {
                let mut calls = self.confirm_calls.lock().unwrap();
                calls.push(request.clone());
                calls.len() - 1
            };
            if self.hang_confirm {
                let _flag = AbortFlag(&self.aborted);
                std::future::pending::<()>().await;
            }
            (self.confirm)(index)
        })
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

type PutFn = Box<dyn Fn(&PutRequest, usize) -> Result<(), TransferError> + Send + Sync>;

/// Object storage stand-in; records each PUT's `Content-Range` (or `None`).
pub(crate) struct MockStorage {
    responder: PutFn,
    ranges: Mutex<Vec<Option<String>>>,
    hang: bool,
    aborted: AtomicBool,
}

struct AbortFlag<'a>(&'a AtomicBool);

impl Drop for AbortFlag<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MockStorage {
    pub fn new(
        responder: impl Fn(&PutRequest, usize) -> Result<(), TransferError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            ranges: Mutex::new(Vec::new()),
            hang: false,
            aborted: AtomicBool::new(false),
        }
    }

    pub fn ok() -> Self {
        Self::new(|_, _| Ok(()))
    }

    /// Rejects every whole-body PUT; ranged PUTs go to `ranged`.
    pub fn direct_fails(
        ranged: impl Fn(&PutRequest, usize) -> Result<(), TransferError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |req, index| match req.content_range {
            None => Err(storage_error(400)),
            Some(_) => ranged(req, index),
        })
    }

    /// Every PUT stays in flight until its future is dropped.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::ok()
        }
    }

    pub fn ranges(&self) -> Vec<Option<String>> {
        self.ranges.lock().unwrap().clone()
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl PutTransport for MockStorage {
    fn put<'a>(
        &'a self,
        request: PutRequest,
        on_sent: &'a SentFn<'a>,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            let index = {
                let mut ranges = self.ranges.lock().unwrap();
                ranges.push(request.content_range.clone());
                ranges.len() - 1
            };

            let len = request.body.len() as u64;
            on_sent(len / 2);

            if self.hang {
                let _flag = AbortFlag(&self.aborted);
                std::future::pending::<()>().await;
            }

            (self.responder)(&request, index)
        })
    }
}

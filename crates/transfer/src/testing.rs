//! Scripted [`PutTransport`] used by the unit tests of this crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::TransferError;
use crate::strategy::BoxFuture;
use crate::transport::{PutRequest, PutTransport, SentFn};

/// What the mock saw for one PUT.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedPut {
    pub url: String,
    pub content_type: String,
    pub content_range: Option<String>,
    pub len: usize,
}

type Responder = Box<dyn Fn(&PutRequest, usize) -> Result<(), TransferError> + Send + Sync>;

pub(crate) struct MockTransport {
    calls: Mutex<Vec<RecordedPut>>,
    responder: Responder,
    hang: bool,
    aborted: AtomicBool,
}

struct AbortFlag<'a>(&'a AtomicBool);

impl Drop for AbortFlag<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MockTransport {
    /// `responder` gets the request and its 0-based call index.
    pub fn new(
        responder: impl Fn(&PutRequest, usize) -> Result<(), TransferError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            hang: false,
            aborted: AtomicBool::new(false),
        }
    }

    pub fn ok() -> Self {
        Self::new(|_, _| Ok(()))
    }

    /// Every PUT stays in flight until its future is dropped.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> Vec<RecordedPut> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

pub(crate) fn status(code: u16) -> TransferError {
    TransferError::Status {
        status: code,
        body: "injected".into(),
    }
}

impl PutTransport for MockTransport {
    fn put<'a>(
        &'a self,
        request: PutRequest,
        on_sent: &'a SentFn<'a>,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(RecordedPut {
                    url: request.url.clone(),
                    content_type: request.content_type.clone(),
                    content_range: request.content_range.clone(),
                    len: request.body.len(),
                });
                calls.len() - 1
            };

            let len = request.body.len() as u64;
            for step in 1..=4 {
                on_sent(len * step / 4);
            }

            if self.hang {
                let _flag = AbortFlag(&self.aborted);
                std::future::pending::<()>().await;
            }

            (self.responder)(&request, index)
        })
    }
}

//! Upload controller: drives the pipeline and publishes its state.
//!
//! One upload runs at a time. State changes are broadcast through a
//! `watch` channel so any number of observers can render them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use recording_protocol::{TransferTarget, UploadContext};
use recording_transfer::{
    HttpTransport, PutTransport, Recording, TransferMetrics, TransferProgress, TransferStats,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::RecordingBackend;
use crate::client::HttpBackend;
use crate::config::UploaderConfig;
use crate::confirm::confirm_upload;
use crate::error::UploadError;
use crate::orchestrator::UploadOrchestrator;
use crate::presigned::acquire_target;
use crate::types::{UploadOutcome, UploadReceipt, UploadSnapshot, UploadState};

/// The last recording handed to [`UploadController::start`].
#[derive(Clone)]
struct Submission {
    recording: Recording,
    context: UploadContext,
}

/// Marks the controller busy and owns the cancel token of the running upload.
///
/// The token is published while the `active` lock is held, so a caller that
/// sees the controller busy can always reach the token.
struct ActiveUpload<'a> {
    busy: &'a AtomicBool,
    active: &'a Mutex<Option<CancellationToken>>,
    cancel: CancellationToken,
}

impl<'a> ActiveUpload<'a> {
    fn begin(busy: &'a AtomicBool, active: &'a Mutex<Option<CancellationToken>>) -> Option<Self> {
        let mut slot = lock(active);
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());
        drop(slot);
        Some(Self {
            busy,
            active,
            cancel,
        })
    }
}

impl Drop for ActiveUpload<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.active);
        *slot = None;
        self.busy.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate(recording: &Recording, context: &UploadContext) -> Result<(), UploadError> {
    if recording.is_empty() {
        return Err(UploadError::Validation("recording is empty".into()));
    }
    if let Some(field) = context.missing_identifier() {
        return Err(UploadError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Owns the upload lifecycle of one recording session.
pub struct UploadController {
    backend: Arc<dyn RecordingBackend>,
    transport: Arc<dyn PutTransport>,
    config: UploaderConfig,
    snapshot: watch::Sender<UploadSnapshot>,
    last: Mutex<Option<Submission>>,
    active: Mutex<Option<CancellationToken>>,
    busy: AtomicBool,
}

impl UploadController {
    pub fn new(
        backend: Arc<dyn RecordingBackend>,
        transport: Arc<dyn PutTransport>,
        config: UploaderConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(UploadSnapshot::default());
        Self {
            backend,
            transport,
            config,
            snapshot,
            last: Mutex::new(None),
            active: Mutex::new(None),
            busy: AtomicBool::new(false),
        }
    }

    /// Creates a controller talking HTTP to the configured backend.
    pub fn from_config(config: UploaderConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let backend =
            HttpBackend::from_config(&config).map_err(|e| UploadError::Config(e.to_string()))?;
        let transport = HttpTransport::new().map_err(|e| UploadError::Config(e.to_string()))?;
        Ok(Self::new(Arc::new(backend), Arc::new(transport), config))
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_uploading(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Uploads `recording`: acquire, transfer with fallback, confirm.
    ///
    /// The recording is kept so a failed upload can be retried with
    /// [`retry`](Self::retry).
    pub async fn start(
        &self,
        recording: Recording,
        context: UploadContext,
    ) -> Result<UploadReceipt, UploadError> {
        let Some(upload) = ActiveUpload::begin(&self.busy, &self.active) else {
            warn!("upload already in progress");
            return Err(UploadError::AlreadyInProgress);
        };

        if let Err(e) = validate(&recording, &context) {
            warn!(error = %e, "upload rejected");
            self.snapshot.send_modify(|s| {
                s.state = UploadState::Error;
                s.error = Some(e.to_string());
                s.outcome = Some(UploadOutcome::Failed(e.to_string()));
            });
            return Err(e);
        }

        *lock(&self.last) = Some(Submission {
            recording: recording.clone(),
            context: context.clone(),
        });
        self.execute(&recording, &context, &upload.cancel).await
    }

    /// Uploads the last submitted recording again with a fresh URL.
    pub async fn retry(&self) -> Result<UploadReceipt, UploadError> {
        let submission = lock(&self.last).clone();
        let Some(Submission { recording, context }) = submission else {
            let err = UploadError::NothingToRetry;
            warn!("{err}");
            self.snapshot.send_modify(|s| s.error = Some(err.to_string()));
            return Err(err);
        };

        info!(job_id = %context.job_id, candidate_id = %context.candidate_id, "retrying upload");
        self.start(recording, context).await
    }

    /// Cancels the upload in flight. Returns `false` when there is none.
    pub fn cancel(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(token) if !token.is_cancelled() => {
                info!("cancelling upload");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Returns to `Idle` and forgets the last recording.
    ///
    /// Does nothing while an upload is running.
    pub fn reset(&self) -> bool {
        if self.is_uploading() {
            return false;
        }
        *lock(&self.last) = None;
        self.snapshot.send_replace(UploadSnapshot::default());
        true
    }

    async fn execute(
        &self,
        recording: &Recording,
        context: &UploadContext,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, UploadError> {
        let mut metrics = TransferMetrics::begin(recording.size());
        self.snapshot.send_replace(UploadSnapshot {
            state: UploadState::Uploading,
            metrics: Some(metrics.clone()),
            ..UploadSnapshot::default()
        });
        info!(
            job_id = %context.job_id,
            candidate_id = %context.candidate_id,
            bytes = recording.size(),
            "upload started"
        );

        let result = self.run_pipeline(recording, context, cancel, &mut metrics).await;
        metrics.finish();
        *lock(&self.active) = None;

        match result {
            Ok((target, stats)) => {
                info!(
                    object_key = %target.object_key,
                    strategy = %stats.strategy,
                    attempts = metrics.attempts,
                    "upload complete"
                );
                self.snapshot.send_modify(|s| {
                    s.state = UploadState::Success;
                    s.error = None;
                    s.outcome = Some(UploadOutcome::Success);
                    s.metrics = Some(metrics.clone());
                });
                Ok(UploadReceipt {
                    object_key: target.object_key,
                    object_url: target.object_url,
                    bucket: target.bucket,
                    region: target.region,
                    stats,
                    metrics,
                })
            }
            Err(err) => {
                let outcome = if err.is_cancelled() {
                    info!("upload cancelled");
                    UploadOutcome::Cancelled
                } else {
                    error!(error = %err, "upload failed");
                    UploadOutcome::Failed(err.to_string())
                };
                self.snapshot.send_modify(|s| {
                    s.state = UploadState::Error;
                    s.error = Some(err.to_string());
                    s.outcome = Some(outcome);
                    s.metrics = Some(metrics.clone());
                });
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        recording: &Recording,
        context: &UploadContext,
        cancel: &CancellationToken,
        metrics: &mut TransferMetrics,
    ) -> Result<(TransferTarget, TransferStats), UploadError> {
        let target = acquire_target(
            self.backend.as_ref(),
            recording,
            context,
            &self.config.acquire_retry,
            cancel,
        )
        .await?;
        self.snapshot
            .send_modify(|s| s.object_key = Some(target.object_key.clone()));

        let orchestrator =
            UploadOrchestrator::from_config(&self.config, self.transport.clone(), cancel.clone());
        let on_progress =
            |progress: TransferProgress| self.snapshot.send_modify(|s| s.progress = progress);
        let stats = orchestrator
            .run_with_fallback(recording, &target, metrics, &on_progress)
            .await?;

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        confirm_upload(
            self.backend.as_ref(),
            &target,
            recording,
            context,
            &self.config.confirm_retry,
            cancel,
        )
        .await?;
        Ok((target, stats))
    }
}

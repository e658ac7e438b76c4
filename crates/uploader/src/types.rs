//! Upload state types.

use recording_transfer::{TransferMetrics, TransferProgress, TransferStats};
use serde::Serialize;

/// Lifecycle of the controller's current upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Idle,
    Uploading,
    Success,
    Error,
}

/// How the last finished upload ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "lowercase")]
pub enum UploadOutcome {
    Success,
    Cancelled,
    Failed(String),
}

/// Everything a UI needs to render the upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSnapshot {
    pub state: UploadState,
    pub progress: TransferProgress,
    /// Message of the last failure, cleared when a new upload starts.
    pub error: Option<String>,
    pub metrics: Option<TransferMetrics>,
    pub outcome: Option<UploadOutcome>,
    /// Destination of the current upload once it is known.
    pub object_key: Option<String>,
}

impl Default for UploadSnapshot {
    fn default() -> Self {
        Self {
            state: UploadState::Idle,
            progress: TransferProgress::zero(),
            error: None,
            metrics: None,
            outcome: None,
            object_key: None,
        }
    }
}

impl UploadSnapshot {
    /// One-line status for display.
    pub fn status_message(&self) -> String {
        match self.state {
            UploadState::Idle => match &self.error {
                Some(err) => err.clone(),
                None => "Ready".into(),
            },
            UploadState::Uploading => format!("Uploading… {}%", self.progress.percentage),
            UploadState::Success => "Upload complete".into(),
            UploadState::Error => match (&self.outcome, &self.error) {
                (Some(UploadOutcome::Cancelled), _) => "Upload cancelled".into(),
                (_, Some(err)) => err.clone(),
                _ => "Upload failed".into(),
            },
        }
    }
}

/// Result of a confirmed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub object_key: String,
    pub object_url: String,
    pub bucket: String,
    pub region: String,
    pub stats: TransferStats,
    pub metrics: TransferMetrics,
}

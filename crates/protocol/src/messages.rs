use serde::{Deserialize, Serialize};

use crate::types::{TransferTarget, UploadContext};

// ---------------------------------------------------------------------------
// Request payloads (form-encoded)
// ---------------------------------------------------------------------------

/// Form body for `POST /recordings/presigned-url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedUrlRequest {
    pub job_id: String,
    pub candidate_id: String,
    pub timestamp: String,
    pub file_size: u64,
    pub content_type: String,
    pub interview_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
}

impl PresignedUrlRequest {
    pub fn new(context: &UploadContext, timestamp: &str, file_size: u64, content_type: &str) -> Self {
        Self {
            job_id: context.job_id.clone(),
            candidate_id: context.candidate_id.clone(),
            timestamp: timestamp.into(),
            file_size,
            content_type: content_type.into(),
            interview_type: context.interview_type.clone(),
            round_number: context.round_number,
        }
    }
}

/// Form body for `POST /recordings/confirm-upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmUploadRequest {
    pub object_key: String,
    pub object_url: String,
    pub job_id: String,
    pub candidate_id: String,
    pub timestamp: String,
    pub file_size: u64,
    pub content_type: String,
    pub interview_type: String,
    pub interview_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_token: Option<String>,
}

impl ConfirmUploadRequest {
    pub fn new(target: &TransferTarget, context: &UploadContext, file_size: u64) -> Self {
        Self {
            object_key: target.object_key.clone(),
            object_url: target.object_url.clone(),
            job_id: context.job_id.clone(),
            candidate_id: context.candidate_id.clone(),
            timestamp: target.timestamp.clone(),
            file_size,
            content_type: target.content_type.clone(),
            interview_type: context.interview_type.clone(),
            interview_id: context.interview_id.clone(),
            round_number: context.round_number,
            round_token: context.round_token.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response payloads (JSON)
// ---------------------------------------------------------------------------

/// Pre-signed destination issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedUrlResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub presigned_url: String,
    #[serde(default)]
    pub object_key: String,
    #[serde(default)]
    pub object_url: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub candidate_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Acknowledgement of a confirmed upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmUploadResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_id: Option<String>,
}

/// A missing `success` flag means the backend did not object.
fn default_true() -> bool {
    true
}

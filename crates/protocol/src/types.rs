use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::messages::PresignedUrlResponse;

/// Identifiers supplied by the session layer for one interview recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadContext {
    pub job_id: String,
    pub candidate_id: String,
    #[serde(default)]
    pub interview_id: String,
    #[serde(default = "default_interview_type")]
    pub interview_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_token: Option<String>,
}

fn default_interview_type() -> String {
    crate::constants::DEFAULT_INTERVIEW_TYPE.into()
}

impl UploadContext {
    /// Creates a context with the default interview type and no round.
    pub fn new(job_id: &str, candidate_id: &str, interview_id: &str) -> Self {
        Self {
            job_id: job_id.into(),
            candidate_id: candidate_id.into(),
            interview_id: interview_id.into(),
            interview_type: default_interview_type(),
            round_number: None,
            round_token: None,
        }
    }

    /// Returns the name of the first required identifier that is blank.
    pub fn missing_identifier(&self) -> Option<&'static str> {
        if self.job_id.trim().is_empty() {
            Some("job_id")
        } else if self.candidate_id.trim().is_empty() {
            Some("candidate_id")
        } else {
            None
        }
    }
}

/// A pre-signed upload destination issued for one upload attempt.
///
/// Immutable once acquired. All strategies of one attempt share it; a new
/// attempt always asks the backend for a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferTarget {
    pub url: String,
    pub object_key: String,
    pub object_url: String,
    pub bucket: String,
    pub region: String,
    pub content_type: String,
    /// Lifetime of `url` in seconds.
    pub expires_in: u64,
    pub timestamp: String,
    pub job_id: String,
    pub candidate_id: String,
    pub acquired_at: Instant,
}

impl TransferTarget {
    /// Builds a target from a backend response.
    ///
    /// `fallback_content_type` is used when the backend echoes an empty one.
    pub fn from_response(
        resp: PresignedUrlResponse,
        fallback_content_type: &str,
        acquired_at: Instant,
    ) -> Self {
        let content_type = if resp.content_type.is_empty() {
            fallback_content_type.to_string()
        } else {
            resp.content_type
        };
        Self {
            url: resp.presigned_url,
            object_key: resp.object_key,
            object_url: resp.object_url,
            bucket: resp.bucket,
            region: resp.region,
            content_type,
            expires_in: resp.expires_in,
            timestamp: resp.timestamp,
            job_id: resp.job_id,
            candidate_id: resp.candidate_id,
            acquired_at,
        }
    }

    /// Instant after which `url` must not be used.
    pub fn expires_at(&self) -> Instant {
        self.acquired_at + Duration::from_secs(self.expires_in)
    }

    /// Returns `true` once the URL lifetime has elapsed.
    ///
    /// A zero `expires_in` means the backend did not say; such targets never expire locally.
    pub fn is_expired(&self) -> bool {
        self.expires_in > 0 && Instant::now() >= self.expires_at()
    }
}

//! Upload error types.

use recording_transfer::TransferError;

/// Errors from the recording backend API.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid auth token")]
    InvalidToken,

    #[error("cancelled")]
    Cancelled,
}

/// Errors produced by the upload flow.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload: {0}")]
    Validation(String),

    #[error("could not obtain an upload URL after {attempts} attempts: {source}")]
    Acquisition {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("upload failed: {0}")]
    Transfer(#[source] TransferError),

    #[error("upload of {object_key} could not be confirmed after {attempts} attempts: {source}")]
    Confirmation {
        object_key: String,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("an upload is already in progress")]
    AlreadyInProgress,

    #[error("No recording to retry")]
    NothingToRetry,

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Returns `true` if the upload stopped because the user cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, UploadError::Cancelled)
    }
}

impl From<TransferError> for UploadError {
    fn from(err: TransferError) -> Self {
        if err.is_cancelled() {
            UploadError::Cancelled
        } else {
            UploadError::Transfer(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_transfer_maps_to_cancelled() {
        let err: UploadError = TransferError::Cancelled.into();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn failed_transfer_keeps_cause() {
        let err: UploadError = TransferError::Status {
            status: 403,
            body: "denied".into(),
        }
        .into();
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "upload failed: storage returned 403: denied");
    }

    #[test]
    fn confirmation_names_object_key() {
        let err = UploadError::Confirmation {
            object_key: "recordings/j1/c1/rec.webm".into(),
            attempts: 3,
            source: BackendError::Rejected("nope".into()),
        };
        assert!(err.to_string().contains("recordings/j1/c1/rec.webm"));
    }
}

//! Wire types shared by the recording upload client and the backend
//! metadata service.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{CONFIRM_UPLOAD_PATH, PRESIGNED_URL_PATH};
pub use messages::{
    ConfirmUploadRequest, ConfirmUploadResponse, PresignedUrlRequest, PresignedUrlResponse,
};
pub use types::{TransferTarget, UploadContext};

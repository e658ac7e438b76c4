//! Interview recording upload flow.
//!
//! This crate holds the **business logic** of getting a finished recording
//! into object storage and registered with the backend. The byte-level
//! strategies live in `recording-transfer`; the backend is reached through
//! the [`RecordingBackend`] trait so the flow can be driven by mocks.
//!
//! # Pipeline
//!
//! 1. **Acquire**: request a pre-signed PUT URL (bounded retry)
//! 2. **Transfer**: push the bytes, falling back Direct → Chunked → Multipart
//! 3. **Confirm**: register the stored object with the backend (bounded retry)
//!
//! [`UploadController`] runs the pipeline and publishes its state.

pub mod backend;
pub mod client;
pub mod config;
pub mod confirm;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod presigned;
#[cfg(test)]
mod testing;
pub mod types;

// Re-export primary types for convenience.
pub use backend::RecordingBackend;
pub use client::HttpBackend;
pub use config::UploaderConfig;
pub use confirm::confirm_upload;
pub use controller::UploadController;
pub use error::{BackendError, UploadError};
pub use orchestrator::UploadOrchestrator;
pub use presigned::acquire_target;
pub use types::{UploadOutcome, UploadReceipt, UploadSnapshot, UploadState};

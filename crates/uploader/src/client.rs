//! Recording backend API client.
//!
//! Async HTTP client using `reqwest`. Requests are form-encoded, responses
//! are JSON. An optional bearer token is attached to every call.

use std::time::Duration;

use recording_protocol::constants::endpoint;
use recording_protocol::{
    CONFIRM_UPLOAD_PATH, ConfirmUploadRequest, ConfirmUploadResponse, PRESIGNED_URL_PATH,
    PresignedUrlRequest, PresignedUrlResponse,
};
use recording_transfer::BoxFuture;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::RecordingBackend;
use crate::config::UploaderConfig;
use crate::error::BackendError;

/// HTTP implementation of [`RecordingBackend`].
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a client for `base_url`, optionally authenticated.
    pub fn new(
        base_url: &str,
        auth_token: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| BackendError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &UploaderConfig) -> Result<Self, BackendError> {
        Self::new(
            &config.api_base_url,
            config.auth_token.as_deref(),
            config.request_timeout(),
        )
    }

    /// Performs a form-encoded POST and decodes the JSON answer.
    async fn post_form<F, R>(&self, path: &str, form: &F) -> Result<R, BackendError>
    where
        F: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = endpoint(&self.base_url, path);
        debug!(%url, "POST");
        let resp = self.http.post(&url).form(form).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl RecordingBackend for HttpBackend {
    fn request_presigned_url<'a>(
        &'a self,
        request: &'a PresignedUrlRequest,
    ) -> BoxFuture<'a, Result<PresignedUrlResponse, BackendError>> {
        Box::pin(self.post_form(PRESIGNED_URL_PATH, request))
    }

    fn confirm_upload<'a>(
        &'a self,
        request: &'a ConfirmUploadRequest,
    ) -> BoxFuture<'a, Result<ConfirmUploadResponse, BackendError>> {
        Box::pin(self.post_form(CONFIRM_UPLOAD_PATH, request))
    }
}

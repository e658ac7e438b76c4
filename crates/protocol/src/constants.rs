/// Backend route that issues a pre-signed PUT destination.
pub const PRESIGNED_URL_PATH: &str = "/recordings/presigned-url";

/// Backend route that records a fully written object.
pub const CONFIRM_UPLOAD_PATH: &str = "/recordings/confirm-upload";

/// Interview type sent when the session collaborator does not supply one.
pub const DEFAULT_INTERVIEW_TYPE: &str = "ai";

/// Content type used for recordings when the capture layer does not say.
pub const DEFAULT_CONTENT_TYPE: &str = "video/webm";

/// Joins a base URL and a route without doubling the slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use recording_protocol::UploadContext;
use recording_protocol::constants::{DEFAULT_CONTENT_TYPE, DEFAULT_INTERVIEW_TYPE};

/// Upload an interview recording to object storage and register it.
#[derive(Debug, Parser)]
#[command(name = "recording-upload", version)]
pub struct Args {
    /// Recording file to upload.
    pub file: PathBuf,

    #[arg(long)]
    pub job_id: String,

    #[arg(long)]
    pub candidate_id: String,

    #[arg(long)]
    pub interview_id: String,

    #[arg(long, default_value = DEFAULT_INTERVIEW_TYPE)]
    pub interview_type: String,

    #[arg(long)]
    pub round_number: Option<u32>,

    #[arg(long)]
    pub round_token: Option<String>,

    /// MIME type of the recording.
    #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
    pub content_type: String,

    /// TOML configuration file.
    #[arg(long, env = "RECORDING_UPLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// How many times a failed upload is retried.
    #[arg(long, default_value_t = 0)]
    pub retries: u32,
}

impl Args {
    pub fn upload_context(&self) -> UploadContext {
        let mut context = UploadContext::new(&self.job_id, &self.candidate_id, &self.interview_id);
        context.interview_type = self.interview_type.clone();
        context.round_number = self.round_number;
        context.round_token = self.round_token.clone();
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invocation_uses_defaults() {
        let args = Args::try_parse_from([
            "recording-upload",
            "rec.webm",
            "--job-id",
            "j1",
            "--candidate-id",
            "c1",
            "--interview-id",
            "i1",
        ])
        .unwrap();

        assert_eq!(args.file, PathBuf::from("rec.webm"));
        assert_eq!(args.content_type, "video/webm");
        assert_eq!(args.retries, 0);

        let ctx = args.upload_context();
        assert_eq!(ctx.job_id, "j1");
        assert_eq!(ctx.interview_type, "ai");
        assert!(ctx.round_number.is_none());
    }

    #[test]
    fn round_fields_reach_context() {
        let args = Args::try_parse_from([
            "recording-upload",
            "rec.mp4",
            "--job-id",
            "j1",
            "--candidate-id",
            "c1",
            "--interview-id",
            "i1",
            "--interview-type",
            "live",
            "--round-number",
            "2",
            "--round-token",
            "tok",
            "--content-type",
            "video/mp4",
            "--retries",
            "3",
        ])
        .unwrap();

        let ctx = args.upload_context();
        assert_eq!(ctx.interview_type, "live");
        assert_eq!(ctx.round_number, Some(2));
        assert_eq!(ctx.round_token.as_deref(), Some("tok"));
        assert_eq!(args.content_type, "video/mp4");
        assert_eq!(args.retries, 3);
    }

    #[test]
    fn job_id_is_required() {
        let result = Args::try_parse_from([
            "recording-upload",
            "rec.webm",
            "--candidate-id",
            "c1",
            "--interview-id",
            "i1",
        ]);
        assert!(result.is_err());
    }
}

//! Recording uploader entry point.

mod args;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use recording_transfer::Recording;
use recording_uploader::{UploadController, UploadError, UploadSnapshot, UploaderConfig};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::args::Args;

/// Failures another attempt cannot fix.
fn is_retryable(err: &UploadError) -> bool {
    !matches!(
        err,
        UploadError::Cancelled
            | UploadError::Validation(_)
            | UploadError::AlreadyInProgress
            | UploadError::NothingToRetry
            | UploadError::Config(_)
            | UploadError::ConfigParse(_)
            | UploadError::Io(_)
    )
}

/// Emits a line whenever the user-visible status changes.
///
/// After `done` fires the latest status is emitted once more if it has not
/// been shown yet, then the reporter returns.
async fn report_progress(
    mut rx: watch::Receiver<UploadSnapshot>,
    done: CancellationToken,
    mut emit: impl FnMut(&str),
) {
    let mut last = String::new();
    loop {
        let finished = tokio::select! {
            changed = rx.changed() => changed.is_err(),
            _ = done.cancelled() => true,
        };
        let line = rx.borrow_and_update().status_message();
        if line != last {
            emit(&line);
            last = line;
        }
        if finished {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => UploaderConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => UploaderConfig::default(),
    };
    tracing::info!(api = %config.api_base_url, strategies = ?config.strategies, "configuration loaded");

    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let recording = Recording::new(data, &args.content_type);

    let controller = Arc::new(UploadController::from_config(config)?);
    let reporting = CancellationToken::new();
    let progress = tokio::spawn(report_progress(
        controller.subscribe(),
        reporting.clone(),
        |line| println!("{line}"),
    ));

    let interrupted = CancellationToken::new();
    {
        let controller = controller.clone();
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.cancel();
                controller.cancel();
            }
        });
    }

    let mut result = controller.start(recording, args.upload_context()).await;
    let mut retries = 0;
    while let Err(err) = &result {
        if retries >= args.retries || interrupted.is_cancelled() || !is_retryable(err) {
            break;
        }
        retries += 1;
        tracing::warn!(retry = retries, of = args.retries, error = %err, "upload failed, retrying");
        result = controller.retry().await;
    }
    reporting.cancel();
    progress.await.context("progress reporter failed")?;

    let receipt = result.context("upload failed")?;
    println!(
        "{} ({} bytes via {}, {} attempt(s))",
        receipt.object_url, receipt.metrics.final_size, receipt.stats.strategy, retries + 1
    );
    Ok(())
}

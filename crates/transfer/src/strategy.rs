use std::future::Future;
use std::pin::Pin;

use recording_protocol::TransferTarget;
use tokio_util::sync::CancellationToken;

use crate::TransferError;
use crate::progress::TransferProgress;
use crate::types::{Recording, StrategyKind, TransferStats};

/// Boxed, sendable future used at the trait seams of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Progress sink. Called synchronously; must only record state.
pub type ProgressFn<'a> = dyn Fn(TransferProgress) + Send + Sync + 'a;

/// One way of getting a recording's bytes to a [`TransferTarget`].
///
/// Strategies are tried in order by the upload orchestrator; each one
/// either delivers every byte or fails with a [`TransferError`].
pub trait TransferStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn run<'a>(
        &'a self,
        recording: &'a Recording,
        target: &'a TransferTarget,
        on_progress: &'a ProgressFn<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<TransferStats, TransferError>>;
}

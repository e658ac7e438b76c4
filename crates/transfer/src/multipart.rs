use recording_protocol::TransferTarget;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::TransferError;
use crate::direct::DirectStrategy;
use crate::strategy::{BoxFuture, ProgressFn, TransferStrategy};
use crate::types::{Recording, StrategyKind, TransferStats};

/// Slot for native multipart uploads.
///
/// The backend does not issue per-part URLs yet, so this delegates to a
/// single direct PUT. Callers must not rely on multipart semantics.
#[derive(Clone)]
pub struct MultipartStrategy {
    direct: DirectStrategy,
}

impl MultipartStrategy {
    pub fn new(direct: DirectStrategy) -> Self {
        Self { direct }
    }
}

impl TransferStrategy for MultipartStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Multipart
    }

    fn run<'a>(
        &'a self,
        recording: &'a Recording,
        target: &'a TransferTarget,
        on_progress: &'a ProgressFn<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<TransferStats, TransferError>> {
        debug!(object_key = %target.object_key, "multipart not available, delegating to direct PUT");
        Box::pin(
            self.direct
                .transfer(recording, target, on_progress, cancel, StrategyKind::Multipart),
        )
    }
}

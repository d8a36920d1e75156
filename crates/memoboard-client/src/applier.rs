//! Applier wrapper that records duplication proofs for queued creates.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use memoboard_core::{ApplyOutcome, OperationApplier, QueueItem};
use memoboard_dedup::DuplicationGuard;

/// Forwards to the remote applier and, when a queued create lands, writes the
/// duplication record its origin describes. Creates applied without a remote
/// id are recorded under the queue item id.
pub struct RecordingApplier {
    inner: Arc<dyn OperationApplier>,
    guard: DuplicationGuard,
}

impl RecordingApplier {
    pub fn new(inner: Arc<dyn OperationApplier>, guard: DuplicationGuard) -> Self {
        Self { inner, guard }
    }
}

#[async_trait]
impl OperationApplier for RecordingApplier {
    async fn apply(&self, item: &QueueItem) -> ApplyOutcome {
        let outcome = self.inner.apply(item).await;

        if let (ApplyOutcome::Applied { remote_id }, Some(origin)) = (&outcome, &item.origin) {
            let remote_id = remote_id.as_deref().unwrap_or(&item.id);
            self.guard
                .record_creation(origin.record_type, &origin.content, &origin.created_by, remote_id)
                .await;
            debug!(item_id = %item.id, remote_id = %remote_id, "Recorded queued create");
        }
        outcome
    }
}

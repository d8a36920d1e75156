//! Submission facade: guard, apply-or-queue, drafts.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use memoboard_core::{
    ApplyOutcome, Clock, ContentFields, CreateOrigin, Error, KeyValueStore, NetworkStatus,
    OperationApplier, OperationKind, QueueItem, RecentContentSource, RecordType, Result,
};
use memoboard_dedup::{DuplicationGuard, SimilarityReport, StoredDuplicationRecords};
use memoboard_drafts::DraftStore;
use memoboard_queue::{AutoProcessHandle, OperationQueue};

use crate::applier::RecordingApplier;
use crate::config::ClientConfig;

/// Where a submission ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Submission {
    /// Written to the remote store directly.
    Applied { remote_id: Option<String> },
    /// Held in the operation queue for a later pass.
    Queued { queue_id: String },
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub submission: Submission,
    /// Recently created content resembling a create. Advisory only; always
    /// empty for updates and deletes.
    pub similar: SimilarityReport,
}

impl SubmitOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self.submission, Submission::Queued { .. })
    }
}

/// Counts from one [`ResilientClient::housekeeping`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HousekeepingReport {
    pub completed_items_pruned: usize,
    pub duplication_records_purged: usize,
    pub drafts_expired: usize,
}

/// Applies user writes directly when online and queues them otherwise.
///
/// Creates pass the duplication guard first; a create that lands, directly or
/// from the queue, leaves a duplication record behind.
#[derive(Clone)]
pub struct ResilientClient {
    applier: Arc<dyn OperationApplier>,
    network: NetworkStatus,
    clock: Arc<dyn Clock>,
    queue: OperationQueue,
    guard: DuplicationGuard,
    drafts: DraftStore,
}

impl ResilientClient {
    /// Assemble a client from pre-built components.
    pub fn new(
        applier: Arc<dyn OperationApplier>,
        network: NetworkStatus,
        clock: Arc<dyn Clock>,
        queue: OperationQueue,
        guard: DuplicationGuard,
        drafts: DraftStore,
    ) -> Self {
        Self {
            applier,
            network,
            clock,
            queue,
            guard,
            drafts,
        }
    }

    /// Build every component over one local store. Duplication records are
    /// kept locally; recent content for similarity checks comes from `recent`.
    pub fn local(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        applier: Arc<dyn OperationApplier>,
        recent: Arc<dyn RecentContentSource>,
        network: NetworkStatus,
        config: ClientConfig,
    ) -> Self {
        let queue = OperationQueue::new(store.clone(), clock.clone(), config.queue);
        let guard = DuplicationGuard::new(
            Arc::new(StoredDuplicationRecords::new(store.clone())),
            recent,
            clock.clone(),
            config.guard,
        );
        let drafts = DraftStore::new(store, clock.clone(), config.drafts);
        Self::new(applier, network, clock, queue, guard, drafts)
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn guard(&self) -> &DuplicationGuard {
        &self.guard
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn network(&self) -> &NetworkStatus {
        &self.network
    }

    /// Submit a create.
    ///
    /// Fails with [`Error::DuplicateSubmission`] when the same user created
    /// identical content within the duplicate window. Otherwise the create is
    /// applied directly when online, and queued when offline or when the
    /// direct attempt fails.
    ///
    /// Two identical creates in flight at the same time can both pass the
    /// guard, since neither is recorded until its write lands. Hosts should
    /// debounce submission in the UI.
    #[instrument(skip(self, record_type, content, created_by, payload), fields(record_type = %record_type, user_id = %created_by))]
    pub async fn create(
        &self,
        record_type: RecordType,
        content: ContentFields,
        created_by: &str,
        payload: JsonValue,
    ) -> Result<SubmitOutcome> {
        self.guard
            .ensure_not_duplicate(record_type, &content, created_by)
            .await?;

        let similar = self
            .guard
            .find_similar(record_type, &content.similarity_text(), created_by)
            .await;
        if similar.is_similar {
            info!(count = similar.matches.len(), "Submitting content similar to recent records");
        }

        let kind = OperationKind::create_for(record_type);
        let origin = CreateOrigin {
            record_type,
            created_by: created_by.to_string(),
            content,
        };

        let submission = match self.try_direct(kind, &payload, Some(&origin)).await {
            Some((item_id, remote_id)) => {
                // without a remote id the create is recorded under the local item id
                let record_id = remote_id.as_deref().unwrap_or(&item_id);
                self.guard
                    .record_creation(record_type, &origin.content, created_by, record_id)
                    .await;
                Submission::Applied { remote_id }
            }
            None => Submission::Queued {
                queue_id: self.queue.enqueue_create(kind, payload, origin),
            },
        };

        Ok(SubmitOutcome {
            submission,
            similar,
        })
    }

    /// Submit an update or delete. Creates must go through [`create`](Self::create).
    #[instrument(skip(self, kind, payload), fields(operation_kind = %kind))]
    pub async fn submit(&self, kind: OperationKind, payload: JsonValue) -> Result<SubmitOutcome> {
        if kind.is_create() {
            return Err(Error::InvalidInput(format!(
                "{kind} must be submitted with create"
            )));
        }

        let submission = match self.try_direct(kind, &payload, None).await {
            Some((_, remote_id)) => Submission::Applied { remote_id },
            None => Submission::Queued {
                queue_id: self.queue.enqueue(kind, payload),
            },
        };

        Ok(SubmitOutcome {
            submission,
            similar: SimilarityReport::default(),
        })
    }

    /// Apply once against the remote store if online. Returns the applied
    /// item's id and the remote id when the write landed, `None` when it
    /// should be queued.
    async fn try_direct(
        &self,
        kind: OperationKind,
        payload: &JsonValue,
        origin: Option<&CreateOrigin>,
    ) -> Option<(String, Option<String>)> {
        if !self.network.is_online() {
            return None;
        }

        let mut item = QueueItem::new(
            Uuid::now_v7().to_string(),
            kind,
            payload.clone(),
            self.queue.config().max_retries,
            self.clock.now(),
        );
        item.origin = origin.cloned();

        let outcome = match AssertUnwindSafe(self.applier.apply(&item)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => ApplyOutcome::failed("Applier panicked"),
        };

        match outcome {
            ApplyOutcome::Applied { remote_id } => Some((item.id, remote_id)),
            ApplyOutcome::Failed(error) => {
                warn!(operation_kind = %kind, error = %error, "Direct apply failed, queueing");
                None
            }
        }
    }

    /// Drain the queue on the configured interval and on reconnect. Queued
    /// creates that land are recorded with the duplication guard.
    pub fn start_auto_processing(&self) -> AutoProcessHandle {
        let applier = Arc::new(RecordingApplier::new(
            self.applier.clone(),
            self.guard.clone(),
        ));
        self.queue.start_auto_processing(
            applier,
            self.network.clone(),
            self.queue.config().auto_process_interval(),
        )
    }

    /// Prune completed queue items, old duplication records and expired drafts.
    pub async fn housekeeping(&self) -> HousekeepingReport {
        let report = HousekeepingReport {
            completed_items_pruned: self
                .queue
                .prune_completed(self.queue.config().completed_retention()),
            duplication_records_purged: self.guard.purge_expired().await,
            drafts_expired: self.drafts.cleanup_expired(),
        };
        info!(
            pruned = report.completed_items_pruned,
            purged = report.duplication_records_purged,
            expired = report.drafts_expired,
            "Housekeeping complete"
        );
        report
    }
}

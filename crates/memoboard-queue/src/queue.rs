//! Persisted operation queue.
//!
//! Write operations that could not be applied immediately are kept in the
//! local key-value store as a single JSON array, in enqueue order. Every
//! mutation is a read-modify-write of the whole array under an in-process
//! lock; there is no coordination with other processes sharing the store.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use memoboard_core::defaults::QUEUE_EVENT_CAPACITY;
use memoboard_core::store::{read_json, remove_entry, write_json};
use memoboard_core::{
    ApplyOutcome, Clock, CreateOrigin, Error, KeyValueStore, OperationApplier, OperationKind,
    QueueItem, QueueSnapshot, QueueStatus,
};

use crate::config::{BackoffPolicy, QueueConfig};

/// Counts for a single drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Items handed to the applier.
    pub attempted: usize,
    /// Items that completed.
    pub processed: usize,
    /// Items that failed and went back to pending.
    pub retried: usize,
    /// Items that exhausted their retries during this pass.
    pub failed: usize,
    /// Pending items skipped because their backoff has not elapsed.
    pub deferred: usize,
    /// The pass did not run because another one was already in flight.
    pub skipped: bool,
}

impl DrainReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// No item was touched, whether the pass ran or was skipped.
    pub fn is_empty(&self) -> bool {
        self.attempted == 0
            && self.processed == 0
            && self.retried == 0
            && self.failed == 0
            && self.deferred == 0
    }
}

/// Event emitted by the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// An item was accepted.
    Enqueued {
        item_id: String,
        operation_kind: OperationKind,
    },
    /// An item's write landed.
    Completed {
        item_id: String,
        operation_kind: OperationKind,
        remote_id: Option<String>,
    },
    /// An attempt failed and the item will be retried.
    RetryScheduled {
        item_id: String,
        retry_count: u32,
        delay: Duration,
        error: String,
    },
    /// An item exhausted its retries. Needs a manual retry or discard.
    Failed {
        item_id: String,
        operation_kind: OperationKind,
        error: String,
    },
    /// A drain pass finished.
    PassFinished(DrainReport),
}

/// Outcome of routing a failed attempt through retry handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryDecision {
    Retry { retry_count: u32, delay: Duration },
    Exhausted,
}

/// Resets the in-flight flag when a pass ends, including on cancellation.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct QueueInner {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
    write_lock: Mutex<()>,
    draining: AtomicBool,
    event_tx: broadcast::Sender<QueueEvent>,
}

/// Persisted queue of pending write operations. Cloning shares the queue.
#[derive(Clone)]
pub struct OperationQueue {
    inner: Arc<QueueInner>,
}

impl OperationQueue {
    /// Create a queue over the given store and clock.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: QueueConfig) -> Self {
        let (event_tx, _) = broadcast::channel(QUEUE_EVENT_CAPACITY);
        Self {
            inner: Arc::new(QueueInner {
                store,
                clock,
                config,
                write_lock: Mutex::new(()),
                draining: AtomicBool::new(false),
                event_tx,
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Subscribe to queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Whether a drain pass is currently running.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    fn load(&self) -> Vec<QueueItem> {
        read_json::<Vec<QueueItem>>(self.inner.store.as_ref(), &self.inner.config.store_key)
            .into_option()
            .unwrap_or_default()
    }

    fn save(&self, items: &[QueueItem]) -> bool {
        write_json(self.inner.store.as_ref(), &self.inner.config.store_key, items)
    }

    /// Read-modify-write the whole queue. The closure returns its result and
    /// whether it changed anything; unchanged queues are not rewritten.
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<QueueItem>) -> (R, bool)) -> R {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut items = self.load();
        let (result, dirty) = f(&mut items);
        if dirty {
            self.save(&items);
        }
        result
    }

    /// Apply `f` to one item, returning the updated copy.
    fn update_item(&self, id: &str, f: impl FnOnce(&mut QueueItem) -> bool) -> Option<QueueItem> {
        self.mutate(|items| match items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                if f(item) {
                    (Some(item.clone()), true)
                } else {
                    (None, false)
                }
            }
            None => (None, false),
        })
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    // -------------------------------------------------------------------------
    // Public operations
    // -------------------------------------------------------------------------

    /// Append a pending operation and return its id.
    ///
    /// Never fails: a storage fault is logged and the id is still returned.
    pub fn enqueue(&self, operation_kind: OperationKind, payload: JsonValue) -> String {
        self.push(operation_kind, payload, None)
    }

    /// Append a create operation together with its origin, so the
    /// duplication record can be written once the create lands.
    pub fn enqueue_create(
        &self,
        operation_kind: OperationKind,
        payload: JsonValue,
        origin: CreateOrigin,
    ) -> String {
        self.push(operation_kind, payload, Some(origin))
    }

    fn push(
        &self,
        operation_kind: OperationKind,
        payload: JsonValue,
        origin: Option<CreateOrigin>,
    ) -> String {
        let id = Uuid::now_v7().to_string();
        let mut item = QueueItem::new(
            id.clone(),
            operation_kind,
            payload,
            self.inner.config.max_retries,
            self.now(),
        );
        item.origin = origin;

        let saved = {
            let _guard = self
                .inner
                .write_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut items = self.load();
            items.push(item);
            self.save(&items)
        };

        if saved {
            debug!(item_id = %id, %operation_kind, "Enqueued operation");
        } else {
            error!(item_id = %id, %operation_kind, "Enqueued operation could not be persisted");
        }
        self.emit(QueueEvent::Enqueued {
            item_id: id.clone(),
            operation_kind,
        });
        id
    }

    /// Look up a single item.
    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.load().into_iter().find(|i| i.id == id)
    }

    /// Read-only snapshot of counts and items.
    pub fn status(&self) -> QueueSnapshot {
        QueueSnapshot::from_items(self.load())
    }

    /// Run one pass over every pending item, in persisted order.
    ///
    /// If another pass is already in flight this returns a report with
    /// `skipped` set, without touching the queue.
    #[instrument(skip(self, applier))]
    pub async fn drain_once(&self, applier: &dyn OperationApplier) -> DrainReport {
        let Some(_guard) = DrainGuard::acquire(&self.inner.draining) else {
            debug!("Drain pass already in flight, skipping");
            return DrainReport::skipped();
        };

        let start = Instant::now();
        let mut report = DrainReport::default();
        let pending: Vec<String> = self
            .load()
            .into_iter()
            .filter(|i| i.status == QueueStatus::Pending)
            .map(|i| i.id)
            .collect();

        if pending.is_empty() {
            trace!("No pending items");
            return report;
        }

        for id in pending {
            let now = self.now();
            let enforce = self.inner.config.backoff == BackoffPolicy::Enforced;

            // Re-read: the item may have been removed or changed since the scan.
            let claimed = self.update_item(&id, |item| {
                if item.status != QueueStatus::Pending {
                    return false;
                }
                if enforce && item.next_attempt_at.is_some_and(|at| at > now) {
                    return false;
                }
                item.status = QueueStatus::Processing;
                true
            });

            let Some(item) = claimed else {
                if enforce && self.get(&id).is_some_and(|i| i.status == QueueStatus::Pending) {
                    trace!(item_id = %id, "Backoff not elapsed, deferring");
                    report.deferred += 1;
                }
                continue;
            };

            report.attempted += 1;
            trace!(item_id = %id, operation_kind = %item.operation_kind, "Applying queued operation");

            let outcome = match AssertUnwindSafe(applier.apply(&item)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => ApplyOutcome::failed("Applier panicked"),
            };

            match outcome {
                ApplyOutcome::Applied { remote_id } => {
                    self.update_item(&id, |item| {
                        item.status = QueueStatus::Completed;
                        item.error_message = None;
                        item.next_attempt_at = None;
                        true
                    });
                    report.processed += 1;
                    debug!(item_id = %id, operation_kind = %item.operation_kind, "Queued operation completed");
                    self.emit(QueueEvent::Completed {
                        item_id: id.clone(),
                        operation_kind: item.operation_kind,
                        remote_id,
                    });
                }
                ApplyOutcome::Failed(message) => match self.handle_retry(&id, &message) {
                    Some(RetryDecision::Retry { retry_count, delay }) => {
                        report.retried += 1;
                        self.emit(QueueEvent::RetryScheduled {
                            item_id: id.clone(),
                            retry_count,
                            delay,
                            error: message,
                        });
                    }
                    Some(RetryDecision::Exhausted) => {
                        report.failed += 1;
                        self.emit(QueueEvent::Failed {
                            item_id: id.clone(),
                            operation_kind: item.operation_kind,
                            error: message,
                        });
                    }
                    None => {
                        warn!(item_id = %id, "Item disappeared while being applied");
                    }
                },
            }
        }

        info!(
            attempted = report.attempted,
            processed = report.processed,
            retried = report.retried,
            failed = report.failed,
            deferred = report.deferred,
            duration_ms = start.elapsed().as_millis() as u64,
            "Drain pass finished"
        );
        self.emit(QueueEvent::PassFinished(report));
        report
    }

    /// Count a failed attempt: back to pending with a backoff, or failed when
    /// retries are exhausted.
    fn handle_retry(&self, id: &str, message: &str) -> Option<RetryDecision> {
        let now = self.now();
        let config = &self.inner.config;
        let mut decision = None;

        self.update_item(id, |item| {
            item.retry_count = (item.retry_count + 1).min(item.max_retries);
            item.error_message = Some(message.to_string());

            if item.retry_count >= item.max_retries {
                item.status = QueueStatus::Failed;
                item.next_attempt_at = None;
                decision = Some(RetryDecision::Exhausted);
            } else {
                let delay = config.backoff_delay(item.retry_count);
                item.status = QueueStatus::Pending;
                item.next_attempt_at = chrono::Duration::from_std(delay)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d));
                decision = Some(RetryDecision::Retry {
                    retry_count: item.retry_count,
                    delay,
                });
            }
            true
        })?;

        match decision {
            Some(RetryDecision::Retry { retry_count, delay }) => {
                warn!(
                    item_id = id,
                    retry_count,
                    backoff_ms = delay.as_millis() as u64,
                    error = message,
                    "Queued operation failed, will retry"
                );
            }
            Some(RetryDecision::Exhausted) => {
                error!(item_id = id, error = message, "Queued operation failed permanently");
            }
            None => {}
        }
        decision
    }

    /// Items that exhausted their retries, as user-visible errors for the
    /// status layer. Oldest first.
    pub fn permanent_failures(&self) -> Vec<Error> {
        self.load()
            .into_iter()
            .filter(|i| i.status == QueueStatus::Failed)
            .map(|i| Error::PermanentFailure {
                message: i.error_message.unwrap_or_default(),
                item_id: i.id,
            })
            .collect()
    }

    /// Move every failed item back to pending with a fresh retry budget.
    pub fn retry_failed_items(&self) -> usize {
        let count = self.mutate(|items| {
            let mut count = 0;
            for item in items.iter_mut().filter(|i| i.status == QueueStatus::Failed) {
                item.status = QueueStatus::Pending;
                item.retry_count = 0;
                item.error_message = None;
                item.next_attempt_at = None;
                count += 1;
            }
            (count, count > 0)
        });
        if count > 0 {
            info!(count, "Failed items reset for retry");
        }
        count
    }

    /// Remove one item. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.mutate(|items| {
            let before = items.len();
            items.retain(|i| i.id != id);
            let removed = items.len() != before;
            (removed, removed)
        });
        if removed {
            debug!(item_id = id, "Removed queue item");
        }
        removed
    }

    /// Drop the whole queue.
    pub fn clear(&self) {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        remove_entry(self.inner.store.as_ref(), &self.inner.config.store_key);
        info!("Queue cleared");
    }

    /// Remove completed items created more than `retention` ago.
    pub fn prune_completed(&self, retention: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|d| self.now().checked_sub_signed(d));
        let Some(cutoff) = cutoff else {
            return 0;
        };

        let pruned = self.mutate(|items| {
            let before = items.len();
            items.retain(|i| i.status != QueueStatus::Completed || i.created_at > cutoff);
            let pruned = before - items.len();
            (pruned, pruned > 0)
        });
        if pruned > 0 {
            debug!(count = pruned, "Pruned completed queue items");
        }
        pruned
    }

    /// Return items left in `processing` (interrupted mid-apply, e.g. by a
    /// crash) to `pending`. Skipped while a pass is in flight.
    pub fn recover_interrupted(&self) -> usize {
        if self.is_draining() {
            return 0;
        }
        let count = self.mutate(|items| {
            let mut count = 0;
            for item in items
                .iter_mut()
                .filter(|i| i.status == QueueStatus::Processing)
            {
                item.status = QueueStatus::Pending;
                count += 1;
            }
            (count, count > 0)
        });
        if count > 0 {
            warn!(count, "Recovered interrupted queue items");
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use memoboard_core::{ManualClock, MemoryStore};
    use serde_json::json;
    use std::collections::HashSet;

    struct AlwaysOk;

    #[async_trait]
    impl OperationApplier for AlwaysOk {
        async fn apply(&self, _item: &QueueItem) -> ApplyOutcome {
            ApplyOutcome::applied()
        }
    }

    struct AlwaysFail;

    #[async_trait]
    impl OperationApplier for AlwaysFail {
        async fn apply(&self, _item: &QueueItem) -> ApplyOutcome {
            ApplyOutcome::failed("remote unavailable")
        }
    }

    struct Panics;

    /// Succeeds after yielding once, so a concurrent pass can run in between.
    #[derive(Default)]
    struct Yielding {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl OperationApplier for Yielding {
        async fn apply(&self, _item: &QueueItem) -> ApplyOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            ApplyOutcome::applied()
        }
    }

    #[async_trait]
    impl OperationApplier for Panics {
        async fn apply(&self, _item: &QueueItem) -> ApplyOutcome {
            panic!("applier bug");
        }
    }

    fn setup(config: QueueConfig) -> (OperationQueue, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        ));
        let queue = OperationQueue::new(store.clone(), clock.clone(), config);
        (queue, store, clock)
    }

    #[test]
    fn test_enqueue_unique_pending_ids() {
        let (queue, _, _) = setup(QueueConfig::default());
        let ids: Vec<String> = (0..20)
            .map(|i| queue.enqueue(OperationKind::UpdateNote, json!({"n": i})))
            .collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());

        let status = queue.status();
        assert_eq!(status.pending, 20);
        for item in &status.items {
            assert_eq!(item.status, QueueStatus::Pending);
            assert_eq!(item.retry_count, 0);
            assert_eq!(item.max_retries, 3);
        }
        // persisted in enqueue order
        let persisted: Vec<&String> = status.items.iter().map(|i| &i.id).collect();
        assert_eq!(persisted, ids.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_enqueue_persists_to_store() {
        let (queue, store, _) = setup(QueueConfig::default());
        queue.enqueue(OperationKind::DeleteNote, json!({"id": "n1"}));
        let raw = store.get("memoboard_queue").unwrap().unwrap();
        assert!(raw.contains("delete_note"));
    }

    #[tokio::test]
    async fn test_drain_with_nothing_pending_is_noop() {
        let (queue, store, _) = setup(QueueConfig::default());
        let report = queue.drain_once(&AlwaysOk).await;
        assert!(report.is_empty());
        assert!(store.get("memoboard_queue").unwrap().is_none());

        let id = queue.enqueue(OperationKind::CreateNote, json!({}));
        queue.drain_once(&AlwaysOk).await;
        let before = queue.status().items;

        let report = queue.drain_once(&AlwaysFail).await;
        assert!(report.is_empty());
        assert_eq!(queue.status().items, before);
        assert_eq!(queue.get(&id).unwrap().status, QueueStatus::Completed);
    }

    #[tokio::test]
    async fn test_drain_success_completes_item() {
        let (queue, _, _) = setup(QueueConfig::default());
        let id = queue.enqueue(OperationKind::CreateThread, json!({"title": "t"}));
        let report = queue.drain_once(&AlwaysOk).await;
        assert_eq!(report.attempted, 1);
        assert_eq!(report.processed, 1);
        let item = queue.get(&id).unwrap();
        assert_eq!(item.status, QueueStatus::Completed);
        assert_eq!(item.retry_count, 0);
    }

    #[tokio::test]
    async fn test_always_failing_item_fails_after_max_retries() {
        let (queue, _, _) = setup(QueueConfig::default());
        let id = queue.enqueue(OperationKind::UpdateThread, json!({}));

        for pass in 1..=3 {
            let report = queue.drain_once(&AlwaysFail).await;
            let item = queue.get(&id).unwrap();
            assert_eq!(item.retry_count, pass);
            assert!(item.retry_count <= item.max_retries);
            if pass < 3 {
                assert_eq!(item.status, QueueStatus::Pending);
                assert_eq!(report.retried, 1);
            } else {
                assert_eq!(item.status, QueueStatus::Failed);
                assert_eq!(report.failed, 1);
                assert_eq!(item.error_message.as_deref(), Some("remote unavailable"));
            }
        }

        let report = queue.drain_once(&AlwaysFail).await;
        assert!(report.is_empty());
        assert_eq!(queue.get(&id).unwrap().retry_count, 3);
    }

    #[tokio::test]
    async fn test_retry_sets_advisory_backoff() {
        let (queue, _, clock) = setup(QueueConfig::default());
        let id = queue.enqueue(OperationKind::UpdateNote, json!({}));
        queue.drain_once(&AlwaysFail).await;
        let item = queue.get(&id).unwrap();
        assert_eq!(
            item.next_attempt_at,
            Some(clock.now() + chrono::Duration::milliseconds(1000))
        );

        // advisory: retried on the very next pass
        let report = queue.drain_once(&AlwaysFail).await;
        assert_eq!(report.attempted, 1);
        let item = queue.get(&id).unwrap();
        assert_eq!(
            item.next_attempt_at,
            Some(clock.now() + chrono::Duration::milliseconds(2000))
        );
    }

    #[tokio::test]
    async fn test_enforced_backoff_defers_until_elapsed() {
        let (queue, _, clock) =
            setup(QueueConfig::default().with_backoff(BackoffPolicy::Enforced));
        let id = queue.enqueue(OperationKind::UpdateNote, json!({}));
        queue.drain_once(&AlwaysFail).await;

        let report = queue.drain_once(&AlwaysOk).await;
        assert_eq!(report.attempted, 0);
        assert_eq!(report.deferred, 1);
        assert_eq!(queue.get(&id).unwrap().status, QueueStatus::Pending);

        clock.advance(chrono::Duration::milliseconds(1001));
        let report = queue.drain_once(&AlwaysOk).await;
        assert_eq!(report.processed, 1);
        assert_eq!(queue.get(&id).unwrap().status, QueueStatus::Completed);
    }

    #[tokio::test]
    async fn test_panicking_applier_counts_as_failure() {
        let (queue, _, _) = setup(QueueConfig::default());
        let id = queue.enqueue(OperationKind::CreateNote, json!({}));
        let report = queue.drain_once(&Panics).await;
        assert_eq!(report.retried, 1);
        let item = queue.get(&id).unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.error_message.as_deref(), Some("Applier panicked"));
        assert!(!queue.is_draining());
    }

    #[tokio::test]
    async fn test_retry_failed_items_resets() {
        let (queue, _, _) = setup(QueueConfig::default().with_max_retries(1));
        let a = queue.enqueue(OperationKind::CreateNote, json!({}));
        let b = queue.enqueue(OperationKind::CreateNote, json!({}));
        queue.drain_once(&AlwaysFail).await;
        assert_eq!(queue.status().failed, 2);

        assert_eq!(queue.retry_failed_items(), 2);
        for id in [&a, &b] {
            let item = queue.get(id).unwrap();
            assert_eq!(item.status, QueueStatus::Pending);
            assert_eq!(item.retry_count, 0);
            assert!(item.error_message.is_none());
        }
        assert_eq!(queue.retry_failed_items(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let (queue, store, _) = setup(QueueConfig::default());
        let a = queue.enqueue(OperationKind::CreateNote, json!({}));
        let b = queue.enqueue(OperationKind::CreateNote, json!({}));
        assert!(queue.remove(&a));
        assert!(!queue.remove(&a));
        assert!(queue.get(&b).is_some());

        queue.clear();
        assert_eq!(queue.status().total(), 0);
        assert!(store.get("memoboard_queue").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prune_completed_respects_retention() {
        let (queue, _, clock) = setup(QueueConfig::default());
        let old = queue.enqueue(OperationKind::CreateNote, json!({}));
        queue.drain_once(&AlwaysOk).await;

        clock.advance(chrono::Duration::hours(25));
        let fresh = queue.enqueue(OperationKind::CreateNote, json!({}));
        let other = queue.enqueue(OperationKind::UpdateNote, json!({}));
        queue.drain_once(&AlwaysOk).await;
        assert!(queue.remove(&other));

        let pruned = queue.prune_completed(Duration::from_secs(24 * 60 * 60));
        assert_eq!(pruned, 1);
        assert!(queue.get(&old).is_none());
        assert!(queue.get(&fresh).is_some());
    }

    #[test]
    fn test_prune_keeps_failed_and_pending() {
        let (queue, _, clock) = setup(QueueConfig::default());
        let id = queue.enqueue(OperationKind::CreateNote, json!({}));
        clock.advance(chrono::Duration::days(3));
        assert_eq!(queue.prune_completed(Duration::from_secs(60)), 0);
        assert!(queue.get(&id).is_some());
    }

    #[test]
    fn test_recover_interrupted() {
        let (queue, store, clock) = setup(QueueConfig::default());
        let mut stuck = QueueItem::new("stuck", OperationKind::UpdateNote, json!({}), 3, clock.now());
        stuck.status = QueueStatus::Processing;
        write_json(store.as_ref(), "memoboard_queue", &vec![stuck]);

        assert_eq!(queue.recover_interrupted(), 1);
        assert_eq!(queue.get("stuck").unwrap().status, QueueStatus::Pending);
        assert_eq!(queue.recover_interrupted(), 0);
    }

    #[test]
    fn test_corrupt_queue_reads_as_empty_and_is_purged() {
        let (queue, store, _) = setup(QueueConfig::default());
        store.set("memoboard_queue", "[{broken").unwrap();
        assert_eq!(queue.status().total(), 0);
        assert!(store.get("memoboard_queue").unwrap().is_none());

        let id = queue.enqueue(OperationKind::CreateNote, json!({}));
        assert!(queue.get(&id).is_some());
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let (queue, _, _) = setup(QueueConfig::default().with_max_retries(1));
        let mut rx = queue.subscribe();
        let id = queue.enqueue(OperationKind::CreateNote, json!({}));
        queue.drain_once(&AlwaysFail).await;

        assert!(matches!(rx.recv().await.unwrap(), QueueEvent::Enqueued { item_id, .. } if item_id == id));
        match rx.recv().await.unwrap() {
            QueueEvent::Failed { item_id, error, .. } => {
                assert_eq!(item_id, id);
                assert_eq!(error, "remote unavailable");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            QueueEvent::PassFinished(DrainReport { failed: 1, .. })
        ));
    }

    #[test]
    fn test_enqueue_create_keeps_origin() {
        let (queue, _, _) = setup(QueueConfig::default());
        let origin = CreateOrigin {
            record_type: memoboard_core::RecordType::Note,
            created_by: "u1".into(),
            content: memoboard_core::ContentFields::note("Title", "Body"),
        };
        let id = queue.enqueue_create(OperationKind::CreateNote, json!({}), origin.clone());
        assert_eq!(queue.get(&id).unwrap().origin, Some(origin));
    }

    #[tokio::test]
    async fn test_overlapping_drains_run_once() {
        let (queue, _, _) = setup(QueueConfig::default());
        queue.enqueue(OperationKind::UpdateNote, json!({"n": 1}));
        queue.enqueue(OperationKind::UpdateNote, json!({"n": 2}));
        let applier = Yielding::default();

        let (a, b) = tokio::join!(queue.drain_once(&applier), queue.drain_once(&applier));

        assert!(!a.skipped);
        assert_eq!(a.attempted, 2);
        assert_eq!(a.processed, 2);
        assert!(b.skipped);
        assert!(b.is_empty());
        assert_eq!(applier.calls.load(Ordering::SeqCst), 2);
        assert_eq!(queue.status().completed, 2);

        // the flag is released once the first pass ends
        let next = queue.drain_once(&applier).await;
        assert!(!next.skipped);
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failures_surface_as_errors() {
        let (queue, _, _) = setup(QueueConfig::default().with_max_retries(1));
        let id = queue.enqueue(OperationKind::DeleteNote, json!({}));
        assert!(queue.permanent_failures().is_empty());

        queue.drain_once(&AlwaysFail).await;

        let errors = queue.permanent_failures();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_user_visible());
        match &errors[0] {
            Error::PermanentFailure { item_id, message } => {
                assert_eq!(item_id, &id);
                assert_eq!(message, "remote unavailable");
            }
            other => panic!("unexpected error {other:?}"),
        }

        queue.retry_failed_items();
        assert!(queue.permanent_failures().is_empty());
    }
}

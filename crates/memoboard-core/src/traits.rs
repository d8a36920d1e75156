//! Collaborator traits for the memoboard resilience layer.
//!
//! Everything outside the queue, guard and draft store (the remote document
//! store, the local persisted store, the clock) is reached through these
//! traits, so each component can be constructed with explicit dependencies and
//! tested with in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// LOCAL PERSISTENCE
// =============================================================================

/// Synchronous persisted key-value store (browser-style local storage).
///
/// Values are opaque strings; callers serialize with `serde_json`. All access
/// is read-modify-write of whole values, with no compare-and-swap.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Enumerate all keys currently stored.
    fn keys(&self) -> Result<Vec<String>>;

    /// Enumerate keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

// =============================================================================
// TIME
// =============================================================================

/// Wall-clock timestamp source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// REMOTE WRITES
// =============================================================================

/// Result of applying a queued operation against the remote document store.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The write landed. Creates report the id the remote store assigned.
    Applied { remote_id: Option<String> },
    /// The write failed; the message is kept on the item.
    Failed(String),
}

impl ApplyOutcome {
    pub fn applied() -> Self {
        Self::Applied { remote_id: None }
    }

    pub fn created(remote_id: impl Into<String>) -> Self {
        Self::Applied {
            remote_id: Some(remote_id.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Performs the actual create/update/delete against the backing document store.
#[async_trait]
pub trait OperationApplier: Send + Sync {
    async fn apply(&self, item: &QueueItem) -> ApplyOutcome;
}

// =============================================================================
// REMOTE QUERIES
// =============================================================================

/// Storage for duplication records, queried by type/hash/user/time.
#[async_trait]
pub trait DuplicationRecordRepository: Send + Sync {
    /// Records matching (type, hash, user) created at or after `since`.
    async fn find_since(
        &self,
        record_type: RecordType,
        content_hash: &str,
        created_by: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DuplicationRecord>>;

    /// Persist a record.
    async fn insert(&self, record: DuplicationRecord) -> Result<()>;

    /// Delete records created before `cutoff`. Returns how many were removed.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Source of a user's recently created records, for similarity checks.
#[async_trait]
pub trait RecentContentSource: Send + Sync {
    async fn recent_by_user(
        &self,
        record_type: RecordType,
        created_by: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecentContent>>;
}

//! Local implementations of the duplication record and recent content
//! collaborators.
//!
//! Hosts that keep these on a remote document store implement
//! [`DuplicationRecordRepository`] and [`RecentContentSource`] themselves;
//! these versions persist to a [`KeyValueStore`] or memory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use memoboard_core::defaults::DUPLICATION_STORE_KEY;
use memoboard_core::store::{read_json, write_json};
use memoboard_core::{
    DuplicationRecord, DuplicationRecordRepository, Error, KeyValueStore, RecentContent,
    RecentContentSource, RecordType, Result,
};

/// Duplication records kept as one JSON array in a key-value store.
pub struct StoredDuplicationRecords {
    store: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl StoredDuplicationRecords {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DUPLICATION_STORE_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Vec<DuplicationRecord> {
        read_json::<Vec<DuplicationRecord>>(self.store.as_ref(), &self.key)
            .into_option()
            .unwrap_or_default()
    }

    fn persist(&self, records: &[DuplicationRecord]) -> Result<()> {
        if write_json(self.store.as_ref(), &self.key, records) {
            Ok(())
        } else {
            Err(Error::Storage(format!("failed to write {}", self.key)))
        }
    }
}

#[async_trait]
impl DuplicationRecordRepository for StoredDuplicationRecords {
    async fn find_since(
        &self,
        record_type: RecordType,
        content_hash: &str,
        created_by: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DuplicationRecord>> {
        Ok(self
            .load()
            .into_iter()
            .filter(|r| {
                r.record_type == record_type
                    && r.content_hash == content_hash
                    && r.created_by == created_by
                    && r.created_at >= since
            })
            .collect())
    }

    async fn insert(&self, record: DuplicationRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut records = self.load();
        records.push(record);
        self.persist(&records)
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        let removed = before - records.len();
        if removed > 0 {
            self.persist(&records)?;
            debug!(count = removed, "Deleted old duplication records");
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    record_type: RecordType,
    created_by: String,
    content: RecentContent,
}

/// In-memory record of what each user created recently.
#[derive(Debug, Default)]
pub struct MemoryContentSource {
    entries: Mutex<Vec<Entry>>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a created record.
    pub fn add(&self, record_type: RecordType, created_by: impl Into<String>, content: RecentContent) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Entry {
                record_type,
                created_by: created_by.into(),
                content,
            });
    }
}

#[async_trait]
impl RecentContentSource for MemoryContentSource {
    async fn recent_by_user(
        &self,
        record_type: RecordType,
        created_by: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecentContent>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries
            .iter()
            .filter(|e| {
                e.record_type == record_type
                    && e.created_by == created_by
                    && e.content.created_at >= since
            })
            .map(|e| e.content.clone())
            .collect())
    }
}

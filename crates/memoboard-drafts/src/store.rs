//! Keyed draft persistence with lazy expiry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use memoboard_core::store::{keys_with_prefix, read_json, remove_entry, write_json};
use memoboard_core::{Clock, Draft, DraftInput, KeyValueStore, Loaded, RecordType};

use crate::config::DraftConfig;

struct DraftStoreInner {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: DraftConfig,
}

/// One draft per `(type, id)`, expired once not saved for longer than the
/// TTL. Cloning shares the store.
#[derive(Clone)]
pub struct DraftStore {
    inner: Arc<DraftStoreInner>,
}

impl DraftStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: DraftConfig) -> Self {
        Self {
            inner: Arc::new(DraftStoreInner {
                store,
                clock,
                config,
            }),
        }
    }

    pub fn config(&self) -> &DraftConfig {
        &self.inner.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn key(&self, draft_type: RecordType, id: &str) -> String {
        format!("{}{}_{}", self.inner.config.key_prefix, draft_type, id)
    }

    fn is_expired(&self, draft: &Draft, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(draft.last_saved);
        // A negative age (clock moved back) is never expired.
        age.to_std()
            .map(|age| age > self.inner.config.ttl())
            .unwrap_or(false)
    }

    /// Upsert a draft, stamping it with the current time. Returns the stored
    /// draft, or `None` if it could not be persisted.
    pub fn save(&self, input: DraftInput) -> Option<Draft> {
        let draft = input.into_draft(self.now());
        let key = self.key(draft.draft_type, &draft.id);

        if !write_json(self.inner.store.as_ref(), &key, &draft) {
            return None;
        }
        debug!(draft_key = %key, auto_saved = draft.auto_saved, "Draft saved");
        Some(draft)
    }

    /// The draft for `(type, id)`, unless absent, corrupt or expired. Expired
    /// and corrupt entries are removed.
    pub fn get(&self, draft_type: RecordType, id: &str) -> Option<Draft> {
        let key = self.key(draft_type, id);
        let draft = read_json::<Draft>(self.inner.store.as_ref(), &key).into_option()?;

        if self.is_expired(&draft, self.now()) {
            debug!(draft_key = %key, "Draft expired, purging");
            remove_entry(self.inner.store.as_ref(), &key);
            return None;
        }
        Some(draft)
    }

    pub fn delete(&self, draft_type: RecordType, id: &str) {
        let key = self.key(draft_type, id);
        if remove_entry(self.inner.store.as_ref(), &key) {
            debug!(draft_key = %key, "Draft deleted");
        }
    }

    /// Restore-and-clear: return the live draft and remove it.
    pub fn take(&self, draft_type: RecordType, id: &str) -> Option<Draft> {
        let draft = self.get(draft_type, id)?;
        self.delete(draft_type, id);
        Some(draft)
    }

    /// All live drafts, most recently saved first. Expired and corrupt entries
    /// encountered are removed.
    pub fn list_all(&self) -> Vec<Draft> {
        self.sweep().0
    }

    /// Remove every expired or corrupt draft. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.sweep().1;
        if removed > 0 {
            info!(count = removed, "Cleaned up expired drafts");
        }
        removed
    }

    fn sweep(&self) -> (Vec<Draft>, usize) {
        let store = self.inner.store.as_ref();
        let now = self.now();
        let mut live = Vec::new();
        let mut removed = 0;

        for key in keys_with_prefix(store, &self.inner.config.key_prefix) {
            match read_json::<Draft>(store, &key) {
                Loaded::Present(draft) if self.is_expired(&draft, now) => {
                    if remove_entry(store, &key) {
                        removed += 1;
                    }
                }
                Loaded::Present(draft) => live.push(draft),
                Loaded::Purged => {
                    warn!(draft_key = %key, "Removed unreadable draft");
                    removed += 1;
                }
                Loaded::Absent => {}
            }
        }

        live.sort_by(|a, b| b.last_saved.cmp(&a.last_saved));
        (live, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use memoboard_core::{ManualClock, MemoryStore};

    fn store() -> (DraftStore, Arc<MemoryStore>, Arc<ManualClock>) {
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let drafts = DraftStore::new(kv.clone(), clock.clone(), DraftConfig::default());
        (drafts, kv, clock)
    }

    #[test]
    fn test_save_then_get() {
        let (drafts, _, clock) = store();
        drafts.save(DraftInput::new(RecordType::Note, "n1").with_title("Hello"));

        let draft = drafts.get(RecordType::Note, "n1").unwrap();
        assert_eq!(draft.title.as_deref(), Some("Hello"));
        assert!(!draft.auto_saved);
        assert_eq!(draft.last_saved, clock.now());
    }

    #[test]
    fn test_save_upserts_single_entry() {
        let (drafts, kv, clock) = store();
        drafts.save(DraftInput::new(RecordType::Thread, "t1").with_title("v1"));
        clock.advance(Duration::seconds(5));
        drafts.save(
            DraftInput::new(RecordType::Thread, "t1")
                .with_title("v2")
                .auto_saved(true),
        );

        assert_eq!(kv.len(), 1);
        let draft = drafts.get(RecordType::Thread, "t1").unwrap();
        assert_eq!(draft.title.as_deref(), Some("v2"));
        assert!(draft.auto_saved);
        assert!(kv.get("memoboard_draft_thread_t1").unwrap().is_some());
    }

    #[test]
    fn test_same_id_different_types_are_separate() {
        let (drafts, _, _) = store();
        drafts.save(DraftInput::new(RecordType::Note, "x").with_content("note"));
        drafts.save(DraftInput::new(RecordType::Thread, "x").with_content("thread"));

        drafts.delete(RecordType::Note, "x");
        assert!(drafts.get(RecordType::Note, "x").is_none());
        assert_eq!(
            drafts.get(RecordType::Thread, "x").unwrap().content.as_deref(),
            Some("thread")
        );
    }

    #[test]
    fn test_ttl_lazy_purge() {
        let (drafts, kv, clock) = store();
        drafts.save(DraftInput::new(RecordType::Note, "n1").with_title("old"));

        clock.advance(Duration::days(7));
        assert!(drafts.get(RecordType::Note, "n1").is_some());

        clock.advance(Duration::milliseconds(1));
        assert!(drafts.get(RecordType::Note, "n1").is_none());
        assert!(kv.is_empty());
    }

    #[test]
    fn test_take_clears() {
        let (drafts, _, _) = store();
        drafts.save(DraftInput::new(RecordType::Note, "n1").with_content("body"));

        let taken = drafts.take(RecordType::Note, "n1").unwrap();
        assert_eq!(taken.content.as_deref(), Some("body"));
        assert!(drafts.get(RecordType::Note, "n1").is_none());
        assert!(drafts.take(RecordType::Note, "n1").is_none());
    }

    #[test]
    fn test_list_all_newest_first_and_purges() {
        let (drafts, kv, clock) = store();
        drafts.save(DraftInput::new(RecordType::Note, "stale").with_title("stale"));
        clock.advance(Duration::days(8));
        drafts.save(DraftInput::new(RecordType::Note, "a").with_title("a"));
        clock.advance(Duration::minutes(1));
        drafts.save(DraftInput::new(RecordType::Thread, "b").with_title("b"));
        kv.set("memoboard_draft_note_broken", "{not json").unwrap();
        kv.set("unrelated", "keep").unwrap();

        let ids: Vec<String> = drafts.list_all().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(kv.len(), 3);
        assert_eq!(kv.get("unrelated").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn test_cleanup_expired_counts() {
        let (drafts, _, clock) = store();
        drafts.save(DraftInput::new(RecordType::Note, "1").with_title("one"));
        drafts.save(DraftInput::new(RecordType::Note, "2").with_title("two"));
        clock.advance(Duration::days(10));
        drafts.save(DraftInput::new(RecordType::Note, "3").with_title("three"));

        assert_eq!(drafts.cleanup_expired(), 2);
        assert_eq!(drafts.cleanup_expired(), 0);
        assert_eq!(drafts.list_all().len(), 1);
    }
}

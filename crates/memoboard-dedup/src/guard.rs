//! Duplicate-submission guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use memoboard_core::{
    Clock, ContentFields, DuplicationRecord, DuplicationRecordRepository, Error,
    RecentContentSource, RecordType, Result,
};

use crate::config::GuardConfig;
use crate::fingerprint::{Fingerprinter, Sha256Fingerprinter};
use crate::similarity::jaccard_similarity;

/// Result of an exact-duplicate check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    /// Id of the record created by the first matching submission.
    pub original_id: Option<String>,
}

impl DuplicateCheck {
    fn clear() -> Self {
        Self::default()
    }

    fn duplicate_of(original_id: String) -> Self {
        Self {
            is_duplicate: true,
            original_id: Some(original_id),
        }
    }
}

/// A recent record resembling the checked text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarMatch {
    pub id: String,
    pub similarity: f64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Advisory result of a similarity check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimilarityReport {
    pub is_similar: bool,
    /// Matches at or above the threshold, most similar first.
    pub matches: Vec<SimilarMatch>,
}

/// Blocks repeat creates of identical content and flags near-duplicates.
///
/// Exact duplicates are detected through duplication records written after a
/// create succeeds. Any failure of the record or content collaborators is
/// logged and read as "not a duplicate" so a guard outage never blocks a
/// create.
#[derive(Clone)]
pub struct DuplicationGuard {
    records: Arc<dyn DuplicationRecordRepository>,
    recent: Arc<dyn RecentContentSource>,
    clock: Arc<dyn Clock>,
    fingerprinter: Arc<dyn Fingerprinter>,
    config: GuardConfig,
}

impl DuplicationGuard {
    /// Create a guard using SHA-256 fingerprints.
    pub fn new(
        records: Arc<dyn DuplicationRecordRepository>,
        recent: Arc<dyn RecentContentSource>,
        clock: Arc<dyn Clock>,
        config: GuardConfig,
    ) -> Self {
        Self {
            records,
            recent,
            clock,
            fingerprinter: Arc::new(Sha256Fingerprinter),
            config,
        }
    }

    /// Replace the fingerprint strategy.
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn fingerprint(&self, content: &ContentFields) -> String {
        self.fingerprinter.fingerprint(content)
    }

    fn since(&self, window: Duration) -> DateTime<Utc> {
        let now = self.clock.now();
        chrono::Duration::from_std(window)
            .ok()
            .and_then(|w| now.checked_sub_signed(w))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `created_by` created identical content within the duplicate
    /// window. The earliest matching record wins.
    #[instrument(skip(self, record_type, content, created_by), fields(record_type = %record_type, user_id = %created_by))]
    pub async fn check_duplicate(
        &self,
        record_type: RecordType,
        content: &ContentFields,
        created_by: &str,
    ) -> DuplicateCheck {
        let hash = self.fingerprint(content);
        let since = self.since(self.config.duplicate_window());

        match self
            .records
            .find_since(record_type, &hash, created_by, since)
            .await
        {
            Ok(found) => match found.into_iter().min_by_key(|r| r.created_at) {
                Some(first) => {
                    debug!(
                        content_hash = %hash,
                        original_id = %first.original_id,
                        "Duplicate submission detected"
                    );
                    DuplicateCheck::duplicate_of(first.original_id)
                }
                None => DuplicateCheck::clear(),
            },
            Err(e) => {
                warn!(error = %e, "Duplicate check failed, allowing create");
                DuplicateCheck::clear()
            }
        }
    }

    /// [`check_duplicate`](Self::check_duplicate) as a `Result`, failing with
    /// [`Error::DuplicateSubmission`].
    pub async fn ensure_not_duplicate(
        &self,
        record_type: RecordType,
        content: &ContentFields,
        created_by: &str,
    ) -> Result<()> {
        let check = self.check_duplicate(record_type, content, created_by).await;
        match check.original_id {
            Some(original_id) if check.is_duplicate => {
                Err(Error::DuplicateSubmission { original_id })
            }
            _ => Ok(()),
        }
    }

    /// Record a confirmed create. Call only after the create succeeded.
    pub async fn record_creation(
        &self,
        record_type: RecordType,
        content: &ContentFields,
        created_by: &str,
        original_id: &str,
    ) {
        let record = DuplicationRecord {
            record_type,
            content_hash: self.fingerprint(content),
            created_by: created_by.to_string(),
            created_at: self.clock.now(),
            original_id: original_id.to_string(),
        };

        if let Err(e) = self.records.insert(record).await {
            warn!(
                record_type = %record_type,
                original_id,
                error = %e,
                "Failed to record creation"
            );
        }
    }

    /// Recent records by `created_by` whose text resembles `text`, using the
    /// configured threshold.
    pub async fn find_similar(
        &self,
        record_type: RecordType,
        text: &str,
        created_by: &str,
    ) -> SimilarityReport {
        self.find_similar_with_threshold(record_type, text, created_by, self.config.similarity_threshold)
            .await
    }

    #[instrument(skip(self, record_type, text, created_by), fields(record_type = %record_type, user_id = %created_by))]
    pub async fn find_similar_with_threshold(
        &self,
        record_type: RecordType,
        text: &str,
        created_by: &str,
        threshold: f64,
    ) -> SimilarityReport {
        let since = self.since(self.config.similarity_window());
        let recent = match self.recent.recent_by_user(record_type, created_by, since).await {
            Ok(recent) => recent,
            Err(e) => {
                warn!(error = %e, "Similarity check failed");
                return SimilarityReport::default();
            }
        };

        let mut matches: Vec<SimilarMatch> = recent
            .into_iter()
            .filter_map(|r| {
                let similarity = jaccard_similarity(text, &r.text);
                (similarity >= threshold).then(|| SimilarMatch {
                    id: r.id,
                    similarity,
                    text: r.text,
                    created_at: r.created_at,
                })
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        if !matches.is_empty() {
            debug!(count = matches.len(), "Similar content found");
        }
        SimilarityReport {
            is_similar: !matches.is_empty(),
            matches,
        }
    }

    /// Delete duplication records older than `retention`. Returns how many
    /// were removed; failures are logged and count as zero.
    pub async fn purge_older_than(&self, retention: Duration) -> usize {
        let cutoff = self.since(retention);
        match self.records.delete_before(cutoff).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Failed to purge duplication records");
                0
            }
        }
    }

    /// Purge with the configured retention.
    pub async fn purge_expired(&self) -> usize {
        self.purge_older_than(self.config.record_retention()).await
    }
}

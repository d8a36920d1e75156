//! Duplication guard configuration.

use std::time::Duration;

use memoboard_core::defaults;
use memoboard_core::env::env_parse;

/// Configuration for [`DuplicationGuard`](crate::DuplicationGuard).
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Identical content from the same user within this window is a duplicate.
    pub duplicate_window_secs: u64,
    /// Window searched for near-duplicate content, in minutes.
    pub similarity_window_minutes: u64,
    /// Jaccard similarity at or above which content is reported as similar.
    pub similarity_threshold: f64,
    /// Duplication records older than this are purged.
    pub record_retention_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            duplicate_window_secs: defaults::DUPLICATE_WINDOW_SECS,
            similarity_window_minutes: defaults::SIMILARITY_WINDOW_MINUTES,
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            record_retention_ms: defaults::DUPLICATION_RECORD_RETENTION_MS,
        }
    }
}

impl GuardConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MEMOBOARD_DEDUP_WINDOW_SECS` | `10` | Duplicate window |
    /// | `MEMOBOARD_SIMILARITY_WINDOW_MINUTES` | `30` | Similarity look-back |
    /// | `MEMOBOARD_SIMILARITY_THRESHOLD` | `0.8` | Similarity threshold (0.0-1.0) |
    /// | `MEMOBOARD_DEDUP_RETENTION_MS` | `86400000` | Record retention |
    pub fn from_env() -> Self {
        let base = Self::default();

        let similarity_threshold = env_parse::<f64>("MEMOBOARD_SIMILARITY_THRESHOLD")
            .filter(|t| (0.0..=1.0).contains(t))
            .unwrap_or(base.similarity_threshold);

        Self {
            duplicate_window_secs: env_parse("MEMOBOARD_DEDUP_WINDOW_SECS")
                .unwrap_or(base.duplicate_window_secs),
            similarity_window_minutes: env_parse("MEMOBOARD_SIMILARITY_WINDOW_MINUTES")
                .unwrap_or(base.similarity_window_minutes),
            similarity_threshold,
            record_retention_ms: env_parse("MEMOBOARD_DEDUP_RETENTION_MS")
                .unwrap_or(base.record_retention_ms),
        }
    }

    pub fn with_duplicate_window(mut self, secs: u64) -> Self {
        self.duplicate_window_secs = secs;
        self
    }

    pub fn with_similarity_window(mut self, minutes: u64) -> Self {
        self.similarity_window_minutes = minutes;
        self
    }

    /// Set the similarity threshold, clamped to `0.0..=1.0`.
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_record_retention(mut self, ms: u64) -> Self {
        self.record_retention_ms = ms;
        self
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_secs(self.duplicate_window_secs)
    }

    pub fn similarity_window(&self) -> Duration {
        Duration::from_secs(self.similarity_window_minutes.saturating_mul(60))
    }

    pub fn record_retention(&self) -> Duration {
        Duration::from_millis(self.record_retention_ms)
    }
}

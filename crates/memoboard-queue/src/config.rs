//! Queue configuration.

use std::time::Duration;

use memoboard_core::defaults;
use memoboard_core::env::{env_flag, env_parse};

/// Whether the computed backoff delay gates re-attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffPolicy {
    /// The delay is recorded on the item and reported, but the next pass
    /// retries the item regardless.
    #[default]
    Advisory,
    /// A pass skips an item until its `next_attempt_at` has passed.
    Enforced,
}

/// Configuration for the operation queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Attempts allowed before an item is marked failed (at least 1).
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Interval between automatic drain passes in milliseconds.
    pub auto_process_interval_ms: u64,
    /// Completed items older than this are pruned after each automatic pass.
    pub completed_retention_ms: u64,
    pub backoff: BackoffPolicy,
    /// Persisted store key for the serialized queue.
    pub store_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::QUEUE_MAX_RETRIES,
            retry_base_delay_ms: defaults::QUEUE_RETRY_BASE_DELAY_MS,
            auto_process_interval_ms: defaults::QUEUE_AUTO_PROCESS_INTERVAL_MS,
            completed_retention_ms: defaults::QUEUE_COMPLETED_RETENTION_MS,
            backoff: BackoffPolicy::default(),
            store_key: defaults::QUEUE_STORE_KEY.to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MEMOBOARD_QUEUE_MAX_RETRIES` | `3` | Attempts before an item fails |
    /// | `MEMOBOARD_QUEUE_RETRY_BASE_DELAY_MS` | `1000` | Backoff base delay |
    /// | `MEMOBOARD_QUEUE_INTERVAL_MS` | `30000` | Auto-processing interval |
    /// | `MEMOBOARD_QUEUE_COMPLETED_RETENTION_MS` | `86400000` | Completed item retention |
    /// | `MEMOBOARD_QUEUE_ENFORCE_BACKOFF` | `false` | Skip items until their backoff elapses |
    pub fn from_env() -> Self {
        let base = Self::default();

        let max_retries = env_parse("MEMOBOARD_QUEUE_MAX_RETRIES")
            .unwrap_or(base.max_retries)
            .max(1);

        let retry_base_delay_ms =
            env_parse("MEMOBOARD_QUEUE_RETRY_BASE_DELAY_MS").unwrap_or(base.retry_base_delay_ms);

        let auto_process_interval_ms = env_parse("MEMOBOARD_QUEUE_INTERVAL_MS")
            .unwrap_or(base.auto_process_interval_ms)
            .max(1);

        let completed_retention_ms = env_parse("MEMOBOARD_QUEUE_COMPLETED_RETENTION_MS")
            .unwrap_or(base.completed_retention_ms);

        let backoff = if env_flag("MEMOBOARD_QUEUE_ENFORCE_BACKOFF") {
            BackoffPolicy::Enforced
        } else {
            BackoffPolicy::Advisory
        };

        Self {
            max_retries,
            retry_base_delay_ms,
            auto_process_interval_ms,
            completed_retention_ms,
            backoff,
            store_key: base.store_key,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_retry_base_delay(mut self, ms: u64) -> Self {
        self.retry_base_delay_ms = ms;
        self
    }

    pub fn with_auto_process_interval(mut self, ms: u64) -> Self {
        self.auto_process_interval_ms = ms.max(1);
        self
    }

    pub fn with_completed_retention(mut self, ms: u64) -> Self {
        self.completed_retention_ms = ms;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_store_key(mut self, key: impl Into<String>) -> Self {
        self.store_key = key.into();
        self
    }

    pub fn auto_process_interval(&self) -> Duration {
        Duration::from_millis(self.auto_process_interval_ms)
    }

    pub fn completed_retention(&self) -> Duration {
        Duration::from_millis(self.completed_retention_ms)
    }

    /// Backoff before the attempt following failure number `retry_count`:
    /// `base * 2^(retry_count - 1)`, saturating.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exp = retry_count.saturating_sub(1).min(32);
        let ms = self.retry_base_delay_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(ms)
    }
}

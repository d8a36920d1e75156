//! Draft store configuration.

use std::time::Duration;

use memoboard_core::defaults;
use memoboard_core::env::env_parse;

/// Configuration for [`DraftStore`](crate::DraftStore).
#[derive(Debug, Clone)]
pub struct DraftConfig {
    /// Interval between auto-save ticks in milliseconds.
    pub auto_save_interval_ms: u64,
    /// Drafts not saved for longer than this are expired.
    pub ttl_ms: u64,
    /// Store key prefix; the full key is `{prefix}{type}_{id}`.
    pub key_prefix: String,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            auto_save_interval_ms: defaults::DRAFT_AUTO_SAVE_INTERVAL_MS,
            ttl_ms: defaults::DRAFT_TTL_MS,
            key_prefix: defaults::DRAFT_KEY_PREFIX.to_string(),
        }
    }
}

impl DraftConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MEMOBOARD_DRAFT_AUTOSAVE_MS` | `5000` | Auto-save interval |
    /// | `MEMOBOARD_DRAFT_TTL_MS` | `604800000` | Draft time-to-live |
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            auto_save_interval_ms: env_parse("MEMOBOARD_DRAFT_AUTOSAVE_MS")
                .unwrap_or(base.auto_save_interval_ms)
                .max(1),
            ttl_ms: env_parse("MEMOBOARD_DRAFT_TTL_MS").unwrap_or(base.ttl_ms),
            key_prefix: base.key_prefix,
        }
    }

    pub fn with_auto_save_interval(mut self, ms: u64) -> Self {
        self.auto_save_interval_ms = ms.max(1);
        self
    }

    pub fn with_ttl(mut self, ms: u64) -> Self {
        self.ttl_ms = ms;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_millis(self.auto_save_interval_ms)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

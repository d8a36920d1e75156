//! Centralized default constants for memoboard.
//!
//! **This module is the single source of truth** for all shared default values.
//! Component config structs (`QueueConfig`, `GuardConfig`, `DraftConfig`) start
//! from these constants and may be overridden from the environment.

// =============================================================================
// OPERATION QUEUE
// =============================================================================

/// Maximum retry count before a queue item is marked failed.
pub const QUEUE_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff between retries (milliseconds).
pub const QUEUE_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Interval between automatic drain passes (milliseconds).
pub const QUEUE_AUTO_PROCESS_INTERVAL_MS: u64 = 30_000;

/// How long completed items are kept before pruning (24 hours).
pub const QUEUE_COMPLETED_RETENTION_MS: u64 = 24 * 60 * 60 * 1000;

/// Persisted store key holding the serialized queue.
pub const QUEUE_STORE_KEY: &str = "memoboard_queue";

/// Broadcast channel capacity for queue events.
pub const QUEUE_EVENT_CAPACITY: usize = 256;

// =============================================================================
// DUPLICATION GUARD
// =============================================================================

/// Window within which identical content from the same user is a duplicate.
pub const DUPLICATE_WINDOW_SECS: u64 = 10;

/// Window searched for near-duplicate text (minutes).
pub const SIMILARITY_WINDOW_MINUTES: u64 = 30;

/// Jaccard similarity at or above which content is reported as similar.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Retention for duplication records (24 hours). Storage hygiene only.
pub const DUPLICATION_RECORD_RETENTION_MS: u64 = 24 * 60 * 60 * 1000;

/// Persisted store key holding locally kept duplication records.
pub const DUPLICATION_STORE_KEY: &str = "memoboard_duplication_records";

// =============================================================================
// DRAFTS
// =============================================================================

/// Interval between draft auto-save ticks (milliseconds).
pub const DRAFT_AUTO_SAVE_INTERVAL_MS: u64 = 5000;

/// Age after which a draft is expired (7 days).
pub const DRAFT_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Key prefix for persisted drafts; the full key is `{prefix}{type}_{id}`.
pub const DRAFT_KEY_PREFIX: &str = "memoboard_draft_";

/// Characters of draft content shown in a summary line.
pub const DRAFT_SUMMARY_CHARS: usize = 50;

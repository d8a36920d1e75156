//! Structured logging field name constants for memoboard.
//!
//! All crates use these constants for consistent structured logging fields,
//! so the host application's log pipeline can query by the same names across
//! the queue, the duplication guard and the draft store.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Storage write lost, permanent operation failure |
//! | WARN  | Recoverable issue: corrupt entry purged, transient failure retried |
//! | INFO  | Lifecycle events (auto processing started/stopped), pass summaries |
//! | DEBUG | Decision points: duplicate detected, backoff computed, draft saved |
//! | TRACE | Per-item iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Component emitting the event.
/// Values: "queue", "dedup", "drafts", "client", "store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "enqueue", "drain_once", "check_duplicate", "save"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Queue item id.
pub const ITEM_ID: &str = "item_id";

/// Queue operation kind (create_note, update_thread, ...).
pub const OPERATION_KIND: &str = "operation_kind";

/// Record type ("note" | "thread").
pub const RECORD_TYPE: &str = "record_type";

/// Persisted store key.
pub const STORE_KEY: &str = "store_key";

/// Draft store key.
pub const DRAFT_KEY: &str = "draft_key";

/// Draft id within its record type.
pub const DRAFT_ID: &str = "draft_id";

/// Id assigned by the remote store to a created record.
pub const REMOTE_ID: &str = "remote_id";

/// Id of the record a duplicate submission repeats.
pub const ORIGINAL_ID: &str = "original_id";

/// Content fingerprint.
pub const CONTENT_HASH: &str = "content_hash";

/// User id the action is attributed to.
pub const USER_ID: &str = "user_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Current retry count of a queue item.
pub const RETRY_COUNT: &str = "retry_count";

/// Computed backoff delay in milliseconds.
pub const BACKOFF_MS: &str = "backoff_ms";

/// Number of entries affected.
pub const COUNT: &str = "count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

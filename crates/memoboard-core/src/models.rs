//! Core data models for the memoboard resilience layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults::DRAFT_SUMMARY_CHARS;

// =============================================================================
// RECORD TYPES
// =============================================================================

/// Kind of board record a create, duplication record or draft refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Note,
    Thread,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Thread => "thread",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "note" => Ok(Self::Note),
            "thread" => Ok(Self::Thread),
            _ => Err(format!("Invalid record type: {}", s)),
        }
    }
}

// =============================================================================
// QUEUE TYPES
// =============================================================================

/// Write operation carried by a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateNote,
    UpdateNote,
    DeleteNote,
    CreateThread,
    UpdateThread,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateNote => "create_note",
            Self::UpdateNote => "update_note",
            Self::DeleteNote => "delete_note",
            Self::CreateThread => "create_thread",
            Self::UpdateThread => "update_thread",
        }
    }

    /// Record type the operation writes to.
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::CreateNote | Self::UpdateNote | Self::DeleteNote => RecordType::Note,
            Self::CreateThread | Self::UpdateThread => RecordType::Thread,
        }
    }

    /// Whether the operation creates a new record (and so passes the duplication guard).
    pub fn is_create(&self) -> bool {
        matches!(self, Self::CreateNote | Self::CreateThread)
    }

    /// The create operation for a record type.
    pub fn create_for(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Note => Self::CreateNote,
            RecordType::Thread => Self::CreateThread,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create_note" => Ok(Self::CreateNote),
            "update_note" => Ok(Self::UpdateNote),
            "delete_note" => Ok(Self::DeleteNote),
            "create_thread" => Ok(Self::CreateThread),
            "update_thread" => Ok(Self::UpdateThread),
            _ => Err(format!("Invalid operation kind: {}", s)),
        }
    }
}

/// Status of an item in the operation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Where a queued create came from, so its duplication record can be written
/// once the create actually lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrigin {
    pub record_type: RecordType,
    pub created_by: String,
    pub content: ContentFields,
}

/// A durable record of one pending write operation with retry bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub operation_kind: OperationKind,
    pub payload: JsonValue,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Earliest time the next attempt should run (computed backoff).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<CreateOrigin>,
}

impl QueueItem {
    /// Create a fresh pending item.
    pub fn new(
        id: impl Into<String>,
        operation_kind: OperationKind,
        payload: JsonValue,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            operation_kind,
            payload,
            created_at: now,
            retry_count: 0,
            max_retries,
            status: QueueStatus::Pending,
            error_message: None,
            next_attempt_at: None,
            origin: None,
        }
    }

    /// Attach the create origin.
    pub fn with_origin(mut self, origin: CreateOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Completed and failed items are only touched by explicit retry or cleanup.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, QueueStatus::Completed | QueueStatus::Failed)
    }
}

/// Read-only snapshot of the queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub items: Vec<QueueItem>,
}

impl QueueSnapshot {
    /// Build a snapshot from the persisted item list.
    pub fn from_items(items: Vec<QueueItem>) -> Self {
        let count = |status: QueueStatus| items.iter().filter(|i| i.status == status).count();
        Self {
            pending: count(QueueStatus::Pending),
            processing: count(QueueStatus::Processing),
            completed: count(QueueStatus::Completed),
            failed: count(QueueStatus::Failed),
            items,
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }
}

// =============================================================================
// DUPLICATION TYPES
// =============================================================================

/// Named content fields of a create action.
///
/// Values are trimmed on insertion and keys are kept sorted, so two contents
/// with the same fields in a different order serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFields(BTreeMap<String, String>);

impl ContentFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field; the value is trimmed.
    pub fn with(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        self.0.insert(name.into(), value.as_ref().trim().to_string());
    }

    /// Note content as submitted from the note form.
    pub fn note(title: &str, text: &str) -> Self {
        Self::new().with("title", title).with("text", text)
    }

    /// Thread content as submitted from the thread form.
    pub fn thread(title: &str, description: &str) -> Self {
        Self::new()
            .with("title", title)
            .with("description", description)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.is_empty())
    }

    /// Space-joined field values, title first, for similarity comparison.
    pub fn similarity_text(&self) -> String {
        let title = self.get("title").into_iter();
        let rest = self
            .0
            .iter()
            .filter(|(k, _)| k.as_str() != "title")
            .map(|(_, v)| v.as_str());
        title
            .chain(rest)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Proof that a creation succeeded, used to detect repeats of the same content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicationRecord {
    pub record_type: RecordType,
    pub content_hash: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub original_id: String,
}

/// A recently created record by a user, as returned by the remote query
/// collaborator for similarity checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentContent {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// DRAFT TYPES
// =============================================================================

/// A locally persisted snapshot of in-progress, not-yet-submitted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub draft_type: RecordType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub last_saved: DateTime<Utc>,
    pub auto_saved: bool,
}

impl Draft {
    /// One-line description: title, content preview, or both.
    pub fn summary(&self) -> String {
        let title = self.title.as_deref().map(str::trim).unwrap_or_default();
        let content = self.content.as_deref().map(str::trim).unwrap_or_default();

        match (title.is_empty(), content.is_empty()) {
            (false, false) => format!("{} - {}", title, preview(content)),
            (false, true) => title.to_string(),
            (true, false) => preview(content),
            (true, true) => "Empty draft".to_string(),
        }
    }

    /// Human-readable age of the last save relative to `now`.
    pub fn last_saved_label(&self, now: DateTime<Utc>) -> String {
        let diff = now.signed_duration_since(self.last_saved);
        let days = diff.num_days();
        let hours = diff.num_hours();
        let minutes = diff.num_minutes();

        if days > 0 {
            plural(days, "day")
        } else if hours > 0 {
            plural(hours, "hour")
        } else if minutes > 0 {
            plural(minutes, "minute")
        } else {
            "just now".to_string()
        }
    }
}

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(DRAFT_SUMMARY_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// A draft as handed to `save`: everything but the save timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftInput {
    pub id: String,
    pub draft_type: RecordType,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub auto_saved: bool,
}

impl DraftInput {
    pub fn new(draft_type: RecordType, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            draft_type,
            thread_id: None,
            title: None,
            content: None,
            color: None,
            auto_saved: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn auto_saved(mut self, auto_saved: bool) -> Self {
        self.auto_saved = auto_saved;
        self
    }

    /// Stamp the input with its save time.
    pub fn into_draft(self, last_saved: DateTime<Utc>) -> Draft {
        Draft {
            id: self.id,
            draft_type: self.draft_type,
            thread_id: self.thread_id,
            title: self.title,
            content: self.content,
            color: self.color,
            last_saved,
            auto_saved: self.auto_saved,
        }
    }
}

/// What the form currently holds, as read by an auto-save tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftContent {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub thread_id: Option<String>,
}

impl DraftContent {
    /// Blank title and blank content means nothing worth saving.
    pub fn is_blank(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.title) && blank(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_record_type_roundtrip_str() {
        for (rt, s) in [(RecordType::Note, "note"), (RecordType::Thread, "thread")] {
            assert_eq!(rt.to_string(), s);
            assert_eq!(s.parse::<RecordType>().unwrap(), rt);
        }
        assert!("memo".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_operation_kind_serialization() {
        let json = serde_json::to_string(&OperationKind::CreateThread).unwrap();
        assert_eq!(json, "\"create_thread\"");
        let parsed: OperationKind = serde_json::from_str("\"delete_note\"").unwrap();
        assert_eq!(parsed, OperationKind::DeleteNote);
    }

    #[test]
    fn test_operation_kind_record_type() {
        assert_eq!(OperationKind::UpdateNote.record_type(), RecordType::Note);
        assert_eq!(OperationKind::UpdateThread.record_type(), RecordType::Thread);
        assert!(OperationKind::CreateNote.is_create());
        assert!(!OperationKind::DeleteNote.is_create());
        assert_eq!(
            OperationKind::create_for(RecordType::Thread),
            OperationKind::CreateThread
        );
    }

    #[test]
    fn test_queue_status_serialization() {
        let json = serde_json::to_string(&QueueStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_queue_item_new_is_pending() {
        let item = QueueItem::new("q1", OperationKind::CreateNote, json!({"a": 1}), 3, ts());
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.retry_count, 0);
        assert_eq!(item.max_retries, 3);
        assert!(item.error_message.is_none());
        assert!(!item.is_terminal());
    }

    #[test]
    fn test_queue_item_omits_empty_optionals() {
        let item = QueueItem::new("q1", OperationKind::DeleteNote, json!(null), 3, ts());
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("error_message").is_none());
        assert!(json.get("next_attempt_at").is_none());
        assert!(json.get("origin").is_none());
    }

    #[test]
    fn test_snapshot_counts() {
        let mut a = QueueItem::new("a", OperationKind::CreateNote, json!({}), 3, ts());
        let mut b = a.clone();
        b.id = "b".into();
        b.status = QueueStatus::Failed;
        let mut c = a.clone();
        c.id = "c".into();
        c.status = QueueStatus::Completed;
        a.status = QueueStatus::Pending;

        let snap = QueueSnapshot::from_items(vec![a, b, c]);
        assert_eq!(snap.pending, 1);
        assert_eq!(snap.processing, 0);
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.total(), 3);
    }

    #[test]
    fn test_content_fields_trim_and_order() {
        let a = ContentFields::new().with("title", "  Hi ").with("text", "body");
        let b = ContentFields::new().with("text", "body  ").with("title", "Hi");
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.get("title"), Some("Hi"));
    }

    #[test]
    fn test_content_fields_similarity_text_title_first() {
        let c = ContentFields::thread("Weekly sync", "agenda items");
        assert_eq!(c.similarity_text(), "Weekly sync agenda items");
        let empty_title = ContentFields::note("", "only body");
        assert_eq!(empty_title.similarity_text(), "only body");
    }

    #[test]
    fn test_content_fields_is_empty() {
        assert!(ContentFields::note("  ", "").is_empty());
        assert!(!ContentFields::note("x", "").is_empty());
    }

    #[test]
    fn test_draft_summary_variants() {
        let base = DraftInput::new(RecordType::Note, "n1").into_draft(ts());
        assert_eq!(base.summary(), "Empty draft");

        let titled = DraftInput::new(RecordType::Note, "n1")
            .with_title("Hello")
            .into_draft(ts());
        assert_eq!(titled.summary(), "Hello");

        let long = "x".repeat(60);
        let both = DraftInput::new(RecordType::Note, "n1")
            .with_title("Hello")
            .with_content(long)
            .into_draft(ts());
        assert_eq!(both.summary(), format!("Hello - {}...", "x".repeat(50)));

        let body_only = DraftInput::new(RecordType::Note, "n1")
            .with_content("short body")
            .into_draft(ts());
        assert_eq!(body_only.summary(), "short body");
    }

    #[test]
    fn test_draft_last_saved_label() {
        let draft = DraftInput::new(RecordType::Thread, "t1").into_draft(ts());
        assert_eq!(draft.last_saved_label(ts() + Duration::seconds(30)), "just now");
        assert_eq!(draft.last_saved_label(ts() + Duration::minutes(1)), "1 minute ago");
        assert_eq!(draft.last_saved_label(ts() + Duration::minutes(5)), "5 minutes ago");
        assert_eq!(draft.last_saved_label(ts() + Duration::hours(3)), "3 hours ago");
        assert_eq!(draft.last_saved_label(ts() + Duration::days(2)), "2 days ago");
    }

    #[test]
    fn test_draft_content_is_blank() {
        assert!(DraftContent::default().is_blank());
        assert!(DraftContent {
            title: Some("   ".into()),
            color: Some("yellow".into()),
            ..Default::default()
        }
        .is_blank());
        assert!(!DraftContent {
            content: Some("text".into()),
            ..Default::default()
        }
        .is_blank());
    }
}

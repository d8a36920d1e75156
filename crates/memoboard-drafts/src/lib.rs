//! # memoboard-drafts
//!
//! Local auto-save and recovery of in-progress input.
//!
//! [`DraftStore`] keeps one draft per `(type, id)` in a key-value store and
//! treats drafts older than the TTL as absent, purging them when they are next
//! touched. [`DraftStore::start_auto_save`] snapshots a form on a timer,
//! independent of network state.

pub mod autosave;
pub mod config;
pub mod store;

pub use autosave::{AutoSaveHandle, AutoSaveOptions};
pub use config::DraftConfig;
pub use store::DraftStore;

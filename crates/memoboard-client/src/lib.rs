//! # memoboard-client
//!
//! [`ResilientClient`] ties the memoboard resilience components together:
//! creates pass the duplication guard, writes are applied directly while
//! online and fall back to the persisted operation queue, and the queue is
//! drained automatically on a timer and on reconnect. The draft store is
//! exposed for forms to auto-save into while the user types.
//!
//! ```ignore
//! let client = ResilientClient::local(store, clock, applier, recent, network, ClientConfig::from_env());
//! let _processing = client.start_auto_processing();
//!
//! match client.create(RecordType::Note, ContentFields::note("Title", "Body"), "alice", payload).await {
//!     Err(Error::DuplicateSubmission { original_id }) => { /* show the existing note */ }
//!     Ok(outcome) if outcome.is_queued() => { /* show "saved offline" */ }
//!     _ => {}
//! }
//! ```

pub mod applier;
pub mod client;
pub mod config;

pub use applier::RecordingApplier;
pub use client::{HousekeepingReport, ResilientClient, SubmitOutcome, Submission};
pub use config::ClientConfig;

//! # memoboard-dedup
//!
//! Duplicate-submission prevention for memoboard creates.
//!
//! - [`DuplicationGuard`] blocks identical content submitted by the same user
//!   within a short window, and reports recently created content with a
//!   similar word set as an advisory.
//! - [`Fingerprinter`] strategies turn normalized content into a stable hash.
//! - [`StoredDuplicationRecords`] and [`MemoryContentSource`] are local
//!   implementations of the guard's collaborators.

pub mod config;
pub mod fingerprint;
pub mod guard;
pub mod records;
pub mod similarity;

pub use config::GuardConfig;
pub use fingerprint::{Fingerprinter, RollingHashFingerprinter, Sha256Fingerprinter};
pub use guard::{DuplicateCheck, DuplicationGuard, SimilarMatch, SimilarityReport};
pub use records::{MemoryContentSource, StoredDuplicationRecords};
pub use similarity::jaccard_similarity;

//! # memoboard-core
//!
//! Core types, traits, and stores for the memoboard client-side resilience
//! layer.
//!
//! This crate provides the data model shared by the operation queue, the
//! duplication guard and the draft store, the collaborator traits they are
//! constructed with, and the local key-value stores they persist to.

pub mod clock;
pub mod connectivity;
pub mod defaults;
pub mod env;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
pub mod traits;

// Re-export commonly used types at crate root
pub use clock::{ManualClock, SystemClock};
pub use connectivity::NetworkStatus;
pub use error::{Error, Result};
pub use models::*;
pub use store::{JsonFileStore, Loaded, MemoryStore};
pub use traits::*;

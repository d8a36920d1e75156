//! # memoboard-queue
//!
//! Persisted operation queue for memoboard.
//!
//! This crate provides:
//! - A write-operation queue persisted to the local key-value store
//! - Retry handling with exponential backoff (advisory or enforced)
//! - Automatic draining on a timer and when connectivity is restored
//! - Queue events over a broadcast channel, for status panels
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use memoboard_core::{MemoryStore, NetworkStatus, OperationKind, SystemClock};
//! use memoboard_queue::{OperationQueue, QueueConfig};
//!
//! let config = QueueConfig::from_env();
//! let interval = config.auto_process_interval();
//! let queue = OperationQueue::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), config);
//!
//! let id = queue.enqueue(OperationKind::UpdateNote, serde_json::json!({"id": "n1"}));
//!
//! let network = NetworkStatus::online();
//! let handle = queue.start_auto_processing(applier, network.clone(), interval);
//!
//! // Teardown
//! handle.shutdown().await;
//! ```

pub mod config;
pub mod processor;
pub mod queue;

pub use config::{BackoffPolicy, QueueConfig};
pub use processor::AutoProcessHandle;
pub use queue::{DrainReport, OperationQueue, QueueEvent};

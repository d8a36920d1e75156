//! Shared fixtures for client integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use memoboard_core::{
    ApplyOutcome, ManualClock, MemoryStore, NetworkStatus, OperationApplier, QueueItem,
};
use memoboard_client::{ClientConfig, ResilientClient};
use memoboard_dedup::MemoryContentSource;
use tokio::sync::Mutex;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fake remote store. Creates get sequential ids unless ids are omitted;
/// payloads whose `key` is scripted fail that many times first.
#[derive(Default)]
pub struct FakeRemote {
    failures_left: Mutex<HashMap<String, u32>>,
    next_id: Mutex<u32>,
    omit_ids: AtomicBool,
    pub applied: Mutex<Vec<QueueItem>>,
}

impl FakeRemote {
    pub async fn fail_times(&self, key: &str, times: u32) {
        self.failures_left.lock().await.insert(key.to_string(), times);
    }

    /// Land creates without reporting a remote id.
    pub fn omit_remote_ids(&self) {
        self.omit_ids.store(true, Ordering::SeqCst);
    }

    pub async fn applied_count(&self) -> usize {
        self.applied.lock().await.len()
    }
}

#[async_trait]
impl OperationApplier for FakeRemote {
    async fn apply(&self, item: &QueueItem) -> ApplyOutcome {
        let key = item.payload["key"].as_str().unwrap_or_default().to_string();
        if let Some(n) = self.failures_left.lock().await.get_mut(&key) {
            if *n > 0 {
                *n -= 1;
                return ApplyOutcome::failed("remote unavailable");
            }
        }

        self.applied.lock().await.push(item.clone());
        if item.operation_kind.is_create() && !self.omit_ids.load(Ordering::SeqCst) {
            let mut next = self.next_id.lock().await;
            *next += 1;
            ApplyOutcome::created(format!("remote-{}", *next))
        } else {
            ApplyOutcome::applied()
        }
    }
}

pub struct Fixture {
    pub client: ResilientClient,
    pub remote: Arc<FakeRemote>,
    pub recent: Arc<MemoryContentSource>,
    pub clock: Arc<ManualClock>,
    pub network: NetworkStatus,
}

pub fn fixture(online: bool) -> Fixture {
    init_tracing();
    let remote = Arc::new(FakeRemote::default());
    let recent = Arc::new(MemoryContentSource::new());
    let clock = Arc::new(ManualClock::default());
    let network = NetworkStatus::new(online);
    let client = ResilientClient::local(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        remote.clone(),
        recent.clone(),
        network.clone(),
        ClientConfig::default(),
    );
    Fixture {
        client,
        remote,
        recent,
        clock,
        network,
    }
}

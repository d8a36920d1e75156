//! Combined configuration for the resilient client.

use memoboard_dedup::GuardConfig;
use memoboard_drafts::DraftConfig;
use memoboard_queue::QueueConfig;

/// Configuration for every component behind [`ResilientClient`](crate::ResilientClient).
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub queue: QueueConfig,
    pub guard: GuardConfig,
    pub drafts: DraftConfig,
}

impl ClientConfig {
    /// Read each component's configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            queue: QueueConfig::from_env(),
            guard: GuardConfig::from_env(),
            drafts: DraftConfig::from_env(),
        }
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_guard(mut self, guard: GuardConfig) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_drafts(mut self, drafts: DraftConfig) -> Self {
        self.drafts = drafts;
        self
    }
}

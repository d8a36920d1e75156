//! Periodic draft auto-save.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

use memoboard_core::{DraftContent, DraftInput, RecordType};

use crate::store::DraftStore;

/// Options for [`DraftStore::start_auto_save`].
#[derive(Debug, Clone)]
pub struct AutoSaveOptions {
    pub enabled: bool,
    /// Overrides the configured auto-save interval.
    pub interval: Option<Duration>,
}

impl Default for AutoSaveOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: None,
        }
    }
}

impl AutoSaveOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            interval: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }
}

/// Handle for a running auto-save. Dropping it stops future ticks.
pub struct AutoSaveHandle {
    running: Option<(mpsc::Sender<()>, JoinHandle<()>)>,
}

impl AutoSaveHandle {
    fn inactive() -> Self {
        Self { running: None }
    }

    /// Whether a timer was armed.
    pub fn is_active(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|(_, task)| !task.is_finished())
    }

    pub fn cancel(&self) {
        if let Some((tx, _)) = &self.running {
            let _ = tx.try_send(());
        }
    }

    /// Stop and wait for the timer task to exit.
    pub async fn shutdown(self) {
        self.cancel();
        if let Some((_, task)) = self.running {
            let _ = task.await;
        }
    }
}

impl DraftStore {
    /// Snapshot `get_content()` into the `(type, id)` draft on every tick.
    ///
    /// Ticks where both title and content are blank save nothing. Saved
    /// drafts are marked `auto_saved`. A disabled handle arms no timer.
    pub fn start_auto_save<F>(
        &self,
        draft_type: RecordType,
        id: impl Into<String>,
        get_content: F,
        options: AutoSaveOptions,
    ) -> AutoSaveHandle
    where
        F: Fn() -> DraftContent + Send + 'static,
    {
        if !options.enabled {
            return AutoSaveHandle::inactive();
        }

        let id = id.into();
        let drafts = self.clone();
        let period = options
            .interval
            .unwrap_or_else(|| self.config().auto_save_interval())
            .max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {}
                }

                let content = match catch_unwind(AssertUnwindSafe(|| get_content())) {
                    Ok(content) => content,
                    Err(_) => {
                        error!(record_type = %draft_type, draft_id = %id, "Draft content provider panicked");
                        continue;
                    }
                };
                if content.is_blank() {
                    continue;
                }

                let mut input = DraftInput::new(draft_type, id.clone()).auto_saved(true);
                input.title = content.title;
                input.content = content.content;
                input.color = content.color;
                input.thread_id = content.thread_id;
                drafts.save(input);
            }

            debug!(record_type = %draft_type, draft_id = %id, "Draft auto-save stopped");
        });

        AutoSaveHandle {
            running: Some((shutdown_tx, task)),
        }
    }
}

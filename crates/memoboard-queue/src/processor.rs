//! Automatic queue processing driven by a timer and connectivity transitions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use memoboard_core::{NetworkStatus, OperationApplier};

use crate::queue::OperationQueue;

/// Why a pass was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Timer,
    Reconnected,
}

/// Handle for a running auto processor.
///
/// Dropping the handle stops the processor as well. Neither cancels a remote
/// call that is already in flight; the current pass finishes first.
pub struct AutoProcessHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl AutoProcessHandle {
    /// Stop future timer firings and the connectivity subscription.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    /// Stop and wait for the processor task to exit.
    pub async fn shutdown(self) {
        self.cancel();
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl OperationQueue {
    /// Drain the queue every `interval` while online, and immediately when
    /// connectivity is restored.
    ///
    /// Items left in `processing` by an interrupted run are returned to
    /// `pending` first. Completed items past the retention window are pruned
    /// after every pass.
    pub fn start_auto_processing(
        &self,
        applier: Arc<dyn OperationApplier>,
        network: NetworkStatus,
        interval: Duration,
    ) -> AutoProcessHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let queue = self.clone();
        let period = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            queue.recover_interrupted();

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut online_rx = network.subscribe();
            let retention = queue.config().completed_retention();

            info!(
                interval_ms = period.as_millis() as u64,
                "Queue auto processing started"
            );

            loop {
                let trigger = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => Trigger::Timer,
                    changed = online_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if !*online_rx.borrow_and_update() {
                            continue;
                        }
                        Trigger::Reconnected
                    }
                };

                if !network.is_online() {
                    trace!("Offline, skipping drain pass");
                    continue;
                }
                if queue.is_draining() {
                    trace!("Drain pass already in flight, skipping");
                    continue;
                }

                debug!(?trigger, "Starting drain pass");
                queue.drain_once(applier.as_ref()).await;
                queue.prune_completed(retention);
            }

            info!("Queue auto processing stopped");
        });

        AutoProcessHandle { shutdown_tx, task }
    }
}

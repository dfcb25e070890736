//! Background reclamation of expired rate limit windows.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::backend::RateLimiterBackend;

/// Spawns the periodic sweep that bounds the limiter's memory.
pub struct Reclaimer;

impl Reclaimer {
    /// Start sweeping `target` every `period`.
    ///
    /// The first sweep runs one full period after start. The task stops
    /// when the returned handle is shut down or dropped.
    pub fn spawn<R>(target: Arc<R>, period: Duration) -> ReclaimerHandle
    where
        R: RateLimiterBackend + ?Sized + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        info!(?period, "Starting window reclaimer");

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = target.reclaim().await;
                        debug!(removed, "Reclaim sweep finished");
                    }
                }
            }

            info!("Window reclaimer stopped");
        });

        ReclaimerHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Owner of a running reclaimer task.
pub struct ReclaimerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ReclaimerHandle {
    /// Stop the reclaimer and wait for its task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Window reclaimer task failed");
            }
        }
    }

    /// Whether the reclaimer task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ReclaimerHandle {
    fn drop(&mut self) {
        // A dropped sender also wakes the task, this just makes it explicit
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

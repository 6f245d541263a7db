//! Cancellable periodic tasks

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A task re-run every `period` until stopped or dropped.
///
/// The first run happens one full period after [`PollHandle::start`]. Runs
/// never overlap: a slow run delays the next tick instead of stacking.
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawn the poll loop on the current runtime.
    ///
    /// The loop ends early when `task` returns [`ControlFlow::Break`].
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, or when called outside a tokio runtime.
    pub fn start<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if task().await.is_break() {
                    tracing::debug!("Poll loop finished");
                    break;
                }
            }
        });

        Self { task: Some(handle) }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the loop. An in-flight run is aborted at its next await point.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

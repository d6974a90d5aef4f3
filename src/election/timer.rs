//! Cancellable background tasks owned by a running election.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct ScheduledTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `action` once after `delay`, unless `cancel` fires first.
    pub fn once<F>(name: &'static str, delay: Duration, cancel: CancellationToken, action: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(task = name, "scheduled task cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    action.await;
                }
            }
        });

        Self {
            name,
            cancel,
            handle,
        }
    }

    /// Run a long-lived task that watches `cancel` itself.
    pub fn spawn<F>(name: &'static str, cancel: CancellationToken, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            cancel,
            handle: tokio::spawn(task),
        }
    }

    /// Safe to call repeatedly and after the task has completed.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(task = self.name, "cancelling scheduled task");
        }
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Dropping a task stops it at its next cancellation check. The handle is not
/// aborted: the deadline drops its own task while closing the election.
impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The deadline timer and tally loop of one election, sharing one token.
pub struct ElectionTasks {
    pub deadline: ScheduledTask,
    pub tally_loop: ScheduledTask,
}

impl ElectionTasks {
    pub fn cancel(&self) {
        self.deadline.cancel();
        self.tally_loop.cancel();
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{QueueError, Result};
use crate::model::worker::status;
use crate::model::WorkerId;
use crate::scheduler::ClaimedTask;
use crate::store::RenderQueue;

/// Polls the queue on a fixed interval on behalf of one worker.
pub struct TaskPoller {
    queue: Arc<RenderQueue>,
    worker_id: WorkerId,
    interval: Duration,
}

impl TaskPoller {
    pub fn new(queue: Arc<RenderQueue>, worker_id: WorkerId) -> Self {
        let interval = queue.config().poll_interval();
        Self {
            queue,
            worker_id,
            interval,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Make one dequeue attempt. A disabled worker never claims anything.
    pub async fn poll_once(&self) -> Result<Option<ClaimedTask>> {
        let queue = Arc::clone(&self.queue);
        let worker_id = self.worker_id;

        tokio::task::spawn_blocking(move || {
            if queue.worker_status(&worker_id)? == status::DISABLED {
                tracing::debug!(worker_id = %worker_id, "Worker disabled, not claiming");
                return Ok(None);
            }
            queue.dequeue_task(&worker_id)
        })
        .await
        .map_err(|e| QueueError::Internal(format!("dequeue task aborted: {}", e)))?
    }

    /// Wait until a task is claimed or `shutdown` is cancelled.
    ///
    /// Returns `Ok(None)` only on shutdown. Store errors end the wait, which
    /// includes the worker being deleted out from under the poller.
    pub async fn next_task(&self, shutdown: &CancellationToken) -> Result<Option<ClaimedTask>> {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(worker_id = %self.worker_id, "Shutdown requested, no longer polling");
                    return Ok(None);
                }
                _ = interval.tick() => {
                    if let Some(task) = self.poll_once().await? {
                        tracing::info!(
                            worker_id = %self.worker_id,
                            job_id = %task.job_id(),
                            task_no = task.task_no(),
                            frames = task.frames(),
                            "Claimed task"
                        );
                        return Ok(Some(task));
                    }
                }
            }
        }
    }
}

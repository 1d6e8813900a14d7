use std::cmp::Ordering;

use crate::error::{QueueError, Result};
use crate::model::{JobId, JobRecord, TaskRecord, WorkerId};
use crate::store::layout::Area;
use crate::store::records::read_record;
use crate::store::RenderQueue;

/// A task handed to a worker, together with the job it belongs to so the
/// caller can build the render command.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedTask {
    pub job: JobRecord,
    pub task: TaskRecord,
}

impl ClaimedTask {
    pub fn job_id(&self) -> &JobId {
        &self.job.id
    }

    pub fn task_no(&self) -> u32 {
        self.task.task_no
    }

    pub fn frames(&self) -> &str {
        &self.task.frames
    }
}

/// Scheduling order: highest priority first, then oldest submission, then
/// job id so the order never depends on directory listing order.
pub fn schedule_order(a: &JobRecord, b: &JobRecord) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.submitted_at.cmp(&b.submitted_at))
        .then(a.id.cmp(&b.id))
}

impl RenderQueue {
    /// The most urgent job that still has queued work, with its lowest queued
    /// task number.
    fn next_candidate(&self) -> Result<Option<(JobRecord, u32)>> {
        let mut queued = self.queued_index()?;
        if queued.is_empty() {
            return Ok(None);
        }

        let mut jobs = self.list_jobs()?;
        jobs.sort_by(schedule_order);

        for job in jobs {
            let first = queued
                .remove(&job.id)
                .and_then(|tasks| tasks.first().copied());
            tracing::trace!(
                job_id = %job.id,
                priority = job.priority,
                name = %job.name,
                queued = first.is_some(),
                "Considering job"
            );
            if let Some(task_no) = first {
                return Ok(Some((job, task_no)));
            }
        }
        Ok(None)
    }

    /// Highest-priority job that has at least one queued task.
    pub fn dequeue_job(&self) -> Result<Option<JobRecord>> {
        Ok(self.next_candidate()?.map(|(job, _)| job))
    }

    /// Claim the next task for `worker_id`.
    ///
    /// Picks the lowest-numbered queued task of [`RenderQueue::dequeue_job`]'s
    /// job and renames it into the worker's claim area. When another worker
    /// wins the rename the queue is listed again, up to `claim_retries`
    /// attempts; after that this returns `Ok(None)` and the worker should
    /// simply poll again later.
    pub fn dequeue_task(&self, worker_id: &WorkerId) -> Result<Option<ClaimedTask>> {
        if !self.worker_exists(worker_id) {
            return Err(QueueError::WorkerNotFound(*worker_id));
        }

        let attempts = self.config().claim_retries.max(1);
        for attempt in 1..=attempts {
            let Some((job, task_no)) = self.next_candidate()? else {
                return Ok(None);
            };

            match self.claim(&job.id, task_no, worker_id) {
                Ok(()) => {
                    let path = self
                        .layout()
                        .task_file(&Area::Claim(*worker_id), &job.id, task_no);
                    // An operator may requeue or delete the task right after the claim.
                    let Some(task) = read_record::<TaskRecord>(&path)? else {
                        tracing::debug!(
                            job_id = %job.id,
                            task_no,
                            worker_id = %worker_id,
                            "Claimed task moved before it could be read"
                        );
                        continue;
                    };
                    tracing::info!(
                        job_id = %job.id,
                        task_no,
                        frames = %task.frames,
                        worker_id = %worker_id,
                        "Task dequeued"
                    );
                    return Ok(Some(ClaimedTask { job, task }));
                }
                Err(QueueError::RaceLost { .. }) => {
                    tracing::debug!(
                        job_id = %job.id,
                        task_no,
                        worker_id = %worker_id,
                        attempt,
                        "Lost claim race, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(worker_id = %worker_id, attempts, "Giving up after repeated claim races");
        Ok(None)
    }
}

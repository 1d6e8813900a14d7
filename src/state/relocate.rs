use std::fs;
use std::io;
use std::thread;
use std::time::Duration;

use crate::error::{QueueError, Result};
use crate::model::{JobId, TaskReport, WorkerId};
use crate::state::machine::{TaskState, Transition};
use crate::store::layout::Area;
use crate::store::RenderQueue;

/// Pause before looking again for a record parked by the task editor.
const EDIT_BACKOFF: Duration = Duration::from_millis(10);

impl RenderQueue {
    /// Move a queued task into `worker_id`'s claim area.
    ///
    /// The rename is the claim: if the record is no longer in `queued`
    /// because another worker renamed it first, this returns `RaceLost` and
    /// nothing changes.
    pub fn claim(&self, job_id: &JobId, task_no: u32, worker_id: &WorkerId) -> Result<()> {
        if !self.worker_exists(worker_id) {
            return Err(QueueError::WorkerNotFound(*worker_id));
        }

        let from = self.layout().task_file(&Area::Queued, job_id, task_no);
        let to = self
            .layout()
            .task_file(&Area::Claim(*worker_id), job_id, task_no);

        match fs::rename(&from, &to) {
            Ok(()) => {
                tracing::debug!(job_id = %job_id, task_no, worker_id = %worker_id, "Task claimed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.worker_exists(worker_id) {
                    Err(QueueError::RaceLost {
                        job_id: *job_id,
                        task_no,
                    })
                } else {
                    Err(QueueError::WorkerNotFound(*worker_id))
                }
            }
            Err(e) => Err(QueueError::storage(&from, e)),
        }
    }

    /// Mark a task done. Returns `false` if it was already completed.
    pub fn complete_task(&self, job_id: &JobId, task_no: u32, report: &TaskReport) -> Result<bool> {
        let moved = self.transition(job_id, task_no, Transition::Complete)?;
        tracing::info!(
            job_id = %job_id,
            task_no,
            worker = ?report.worker,
            elapsed_secs = ?report.elapsed.map(|d| d.as_secs_f64()),
            moved,
            "Task completed"
        );
        Ok(moved)
    }

    /// Mark a task failed. Returns `false` if it was already failed.
    pub fn fail_task(&self, job_id: &JobId, task_no: u32, report: &TaskReport) -> Result<bool> {
        let moved = self.transition(job_id, task_no, Transition::Fail)?;
        tracing::warn!(
            job_id = %job_id,
            task_no,
            worker = ?report.worker,
            elapsed_secs = ?report.elapsed.map(|d| d.as_secs_f64()),
            moved,
            "Task failed"
        );
        Ok(moved)
    }

    /// Put a task back in the queue. Returns `false` if it was already queued.
    pub fn requeue_task(&self, job_id: &JobId, task_no: u32) -> Result<bool> {
        let moved = self.transition(job_id, task_no, Transition::Requeue)?;
        if moved {
            tracing::info!(job_id = %job_id, task_no, "Task requeued");
        }
        Ok(moved)
    }

    /// Apply `transition` to a task wherever its record currently is.
    ///
    /// Returns `Ok(false)` when the task is already in the target state. If
    /// the record moves between lookup and rename the lookup is repeated, up
    /// to `relocate_retries` times, before reporting `RaceLost`.
    pub fn transition(&self, job_id: &JobId, task_no: u32, transition: Transition) -> Result<bool> {
        if let Transition::Claim(worker_id) = &transition {
            if !self.worker_exists(worker_id) {
                return Err(QueueError::WorkerNotFound(*worker_id));
            }
        }

        for attempt in 0..=self.config().relocate_retries {
            let location = self
                .locate_task(job_id, task_no)?
                .ok_or(QueueError::TaskNotFound {
                    job_id: *job_id,
                    task_no,
                })?;

            let Some(current) = location.state() else {
                tracing::debug!(job_id = %job_id, task_no, attempt, "Task is being edited");
                thread::sleep(EDIT_BACKOFF);
                continue;
            };
            let Some(target) = current.apply(&transition)? else {
                return Ok(false);
            };

            let to = self
                .layout()
                .task_file(&Area::for_state(&target), job_id, task_no);
            match fs::rename(&location.path, &to) {
                Ok(()) => {
                    log_move(job_id, task_no, &current, &target);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(job_id = %job_id, task_no, attempt, "Task moved concurrently");
                }
                Err(e) => return Err(QueueError::storage(&location.path, e)),
            }
        }

        Err(QueueError::RaceLost {
            job_id: *job_id,
            task_no,
        })
    }
}

fn log_move(job_id: &JobId, task_no: u32, from: &TaskState, to: &TaskState) {
    tracing::debug!(job_id = %job_id, task_no, from = %from, to = %to, "Task moved");
}

//! Operator-side task editing: combining, splitting and bulk requeueing.
//!
//! Edits that rewrite task records first rename every affected record from
//! `queued` into the `editing` area. Once parked there no worker can claim
//! them, so validation and rewriting happen on records this process owns.
//! If a step fails before anything is rewritten, the records are renamed
//! back and the queue is left as it was.

pub mod combine;
pub mod split;

use std::fs;
use std::io;

use crate::error::{QueueError, Result};
use crate::model::{JobId, TaskRecord, WorkerId};
use crate::state::Transition;
use crate::store::layout::Area;
use crate::store::records::write_record;
use crate::store::RenderQueue;

impl RenderQueue {
    /// Requeue every task of a job that is not already queued. Returns how
    /// many records were moved, so a second call returns 0.
    ///
    /// Records left in the editing area by an interrupted edit are returned
    /// to the queue as well.
    pub fn requeue_job(&self, job_id: &JobId) -> Result<usize> {
        let locations = self.find_task_files(job_id, None)?;
        if locations.is_empty() {
            // Distinguish "no tasks" from "no such job".
            self.read_job(job_id)?;
            return Ok(0);
        }

        let mut moved = 0;
        for location in locations {
            let needs_move = match location.state() {
                Some(state) => state.apply(&Transition::Requeue)?.is_some(),
                None => true,
            };
            if !needs_move {
                continue;
            }

            let to = self
                .layout()
                .task_file(&Area::Queued, job_id, location.task_no);
            match fs::rename(&location.path, &to) {
                Ok(()) => moved += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(
                        job_id = %job_id,
                        task_no = location.task_no,
                        "Task moved concurrently, skipping"
                    );
                }
                Err(e) => return Err(QueueError::storage(&location.path, e)),
            }
        }

        tracing::info!(job_id = %job_id, moved, "Job requeued");
        Ok(moved)
    }

    /// Return everything in a worker's claim area to the queue, e.g. after
    /// the worker crashed. Returns the rescued tasks.
    pub fn requeue_worker_tasks(&self, worker_id: &WorkerId) -> Result<Vec<(JobId, u32)>> {
        let mut rescued = Vec::new();
        for (job_id, task_no) in self.claimed_tasks(worker_id)? {
            let from = self
                .layout()
                .task_file(&Area::Claim(*worker_id), &job_id, task_no);
            let to = self.layout().task_file(&Area::Queued, &job_id, task_no);
            match fs::rename(&from, &to) {
                Ok(()) => rescued.push((job_id, task_no)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(QueueError::storage(&from, e)),
            }
        }

        if !rescued.is_empty() {
            tracing::info!(worker_id = %worker_id, tasks = rescued.len(), "Requeued worker's claimed tasks");
        }
        Ok(rescued)
    }

    /// Park a queued task in the editing area.
    fn stage(&self, job_id: &JobId, task_no: u32, action: &str) -> Result<()> {
        let from = self.layout().task_file(&Area::Queued, job_id, task_no);
        let to = self.layout().task_file(&Area::Editing, job_id, task_no);
        match fs::rename(&from, &to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(self.not_queued(job_id, task_no, action))
            }
            Err(e) => Err(QueueError::storage(&from, e)),
        }
    }

    /// Explain why a task that should be queued is not.
    fn not_queued(&self, job_id: &JobId, task_no: u32, action: &str) -> QueueError {
        match self.locate_task(job_id, task_no) {
            Ok(Some(location)) => match location.state() {
                Some(state) => QueueError::InvalidTransition {
                    from: state.to_string(),
                    transition: action.to_string(),
                },
                None => QueueError::RaceLost {
                    job_id: *job_id,
                    task_no,
                },
            },
            Ok(None) => QueueError::TaskNotFound {
                job_id: *job_id,
                task_no,
            },
            Err(e) => e,
        }
    }

    /// Return parked records to the queue untouched.
    fn unstage(&self, job_id: &JobId, task_nos: &[u32]) {
        for &task_no in task_nos {
            if let Err(e) = self.publish(job_id, task_no) {
                tracing::warn!(
                    job_id = %job_id,
                    task_no,
                    error = %e,
                    "Could not return edited task to the queue"
                );
            }
        }
    }

    /// Rewrite parked records with their original content and return them to
    /// the queue. Pieces already removed during the edit are recreated.
    fn restore(&self, job_id: &JobId, task_nos: &[u32], originals: &[TaskRecord]) {
        for (&task_no, record) in task_nos.iter().zip(originals) {
            let path = self.layout().task_file(&Area::Editing, job_id, task_no);
            if let Err(e) = write_record(&path, record) {
                tracing::warn!(
                    job_id = %job_id,
                    task_no,
                    error = %e,
                    "Could not restore edited task"
                );
            }
        }
        self.unstage(job_id, task_nos);
    }

    /// Move a parked record back into `queued`.
    fn publish(&self, job_id: &JobId, task_no: u32) -> Result<()> {
        let from = self.layout().task_file(&Area::Editing, job_id, task_no);
        let to = self.layout().task_file(&Area::Queued, job_id, task_no);
        fs::rename(&from, &to).map_err(|e| QueueError::storage(&from, e))
    }
}

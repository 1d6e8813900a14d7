use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::error::{QueueError, Result};
use crate::model::job::validate_priority;
use crate::model::{FrameSet, JobId, JobRecord, NewJob, TaskRecord, WorkerId};
use crate::store::layout::Area;
use crate::store::records::{read_record, remove_record, replace_record, write_record};
use crate::store::RenderQueue;

/// Outcome of [`RenderQueue::delete_job`].
#[derive(Debug, Clone, PartialEq)]
pub struct JobDeletion {
    pub job_id: JobId,
    pub job_record_removed: bool,
    pub removed_tasks: usize,
    /// Tasks that were sitting in a worker's claim area. Their renders are not
    /// stopped by the deletion.
    pub in_flight: Vec<(u32, WorkerId)>,
}

impl JobDeletion {
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }
}

impl RenderQueue {
    /// Create a job and queue one task per frame set, numbered from zero.
    ///
    /// Tasks are written before the job record, so schedulers never see a job
    /// whose tasks are still being created.
    pub fn create_job(&self, new: NewJob) -> Result<JobId> {
        let priority = validate_priority(new.priority)?;
        if new.tasks.is_empty() {
            return Err(QueueError::InvalidArgument(
                "a job needs at least one task".to_string(),
            ));
        }
        let tasks: Vec<String> = new.tasks.iter().map(|t| t.trim().to_string()).collect();
        for frames in &tasks {
            frames.parse::<FrameSet>()?;
        }

        let next_task_no = u32::try_from(tasks.len())
            .map_err(|_| QueueError::InvalidArgument("too many tasks".to_string()))?;

        let job_id = JobId::new();
        let mut written: Vec<PathBuf> = Vec::with_capacity(tasks.len());
        for (index, frames) in tasks.iter().enumerate() {
            let task_no = index as u32;
            let path = self.layout().task_file(&Area::Queued, &job_id, task_no);
            if let Err(e) = write_record(&path, &TaskRecord::new(job_id, task_no, frames.as_str())) {
                for path in &written {
                    let _ = remove_record(path);
                }
                return Err(e);
            }
            written.push(path);
        }

        let record = JobRecord {
            id: job_id,
            name: new.name,
            priority,
            job_type: new.job_type,
            tasks,
            submitted_at: Utc::now(),
            next_task_no,
            params: new.params,
        };
        if let Err(e) = write_record(&self.layout().job_file(&job_id), &record) {
            for path in &written {
                let _ = remove_record(path);
            }
            return Err(e);
        }

        tracing::info!(
            job_id = %job_id,
            name = %record.name,
            priority,
            tasks = record.tasks.len(),
            "Job submitted"
        );
        Ok(job_id)
    }

    pub fn read_job(&self, job_id: &JobId) -> Result<JobRecord> {
        read_record(&self.layout().job_file(job_id))?.ok_or(QueueError::JobNotFound(*job_id))
    }

    /// All job records, in no particular order. Unreadable records are
    /// skipped with a warning.
    pub fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let dir = self.layout().jobs_dir();
        let entries = fs::read_dir(dir).map_err(|e| QueueError::storage(dir, e))?;

        let mut jobs = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_record::<JobRecord>(&path) {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable job record"),
            }
        }
        Ok(jobs)
    }

    pub fn job_priority(&self, job_id: &JobId) -> Result<u8> {
        Ok(self.read_job(job_id)?.priority)
    }

    /// Change a job's priority. Returns `false` without touching the record
    /// if the priority is already `priority`.
    pub fn set_job_priority(&self, job_id: &JobId, priority: i64) -> Result<bool> {
        let priority = validate_priority(priority)?;
        let mut job = self.read_job(job_id)?;
        if job.priority == priority {
            tracing::debug!(job_id = %job_id, priority, "Priority unchanged");
            return Ok(false);
        }

        let previous = job.priority;
        job.priority = priority;
        if !replace_record(&self.layout().job_file(job_id), &job)? {
            return Err(QueueError::JobNotFound(*job_id));
        }
        tracing::info!(job_id = %job_id, previous, priority, "Job priority changed");
        Ok(true)
    }

    /// Reserve `count` fresh task numbers for a job and return the first.
    ///
    /// The high-water mark on the job record moves before any task uses the
    /// numbers, so a number is handed out at most once even if the caller
    /// later fails or the tasks are deleted.
    pub(crate) fn reserve_task_numbers(&self, job_id: &JobId, count: u32) -> Result<u32> {
        let mut job = self.read_job(job_id)?;
        let highest_present = self
            .find_task_files(job_id, None)?
            .iter()
            .filter(|location| location.path.is_file())
            .map(|location| location.task_no.saturating_add(1))
            .max()
            .unwrap_or(0);
        let seeded = u32::try_from(job.tasks.len()).unwrap_or(u32::MAX);
        let first = job.next_task_no.max(seeded).max(highest_present);

        job.next_task_no = first
            .checked_add(count)
            .ok_or_else(|| QueueError::InvalidArgument("task numbers exhausted".to_string()))?;
        if !replace_record(&self.layout().job_file(job_id), &job)? {
            return Err(QueueError::JobNotFound(*job_id));
        }
        tracing::debug!(job_id = %job_id, first, count, "Reserved task numbers");
        Ok(first)
    }

    /// Delete a job and every one of its task records, wherever they are.
    ///
    /// Tasks currently claimed by a worker are deleted too and reported in
    /// [`JobDeletion::in_flight`]; stopping the render is up to the caller.
    pub fn delete_job(&self, job_id: &JobId) -> Result<JobDeletion> {
        // Job record first so schedulers stop choosing this job.
        let job_record_removed = remove_record(&self.layout().job_file(job_id))?;
        let mut deletion = JobDeletion {
            job_id: *job_id,
            job_record_removed,
            removed_tasks: 0,
            in_flight: Vec::new(),
        };

        // Records can move between the scan and the removal; rescan until
        // nothing is left.
        for pass in 0..=self.config().relocate_retries {
            let locations = self.find_task_files(job_id, None)?;
            if locations.is_empty() {
                break;
            }
            if pass > 0 {
                tracing::debug!(job_id = %job_id, pass, "Rescanning for moved task records");
            }
            for location in locations {
                if let Area::Claim(worker) = location.area {
                    tracing::warn!(
                        job_id = %job_id,
                        task_no = location.task_no,
                        worker_id = %worker,
                        "Deleting task that is currently rendering"
                    );
                    if !deletion.in_flight.contains(&(location.task_no, worker)) {
                        deletion.in_flight.push((location.task_no, worker));
                    }
                }
                if remove_record(&location.path)? {
                    deletion.removed_tasks += 1;
                }
            }
        }

        if !deletion.job_record_removed && deletion.removed_tasks == 0 {
            return Err(QueueError::JobNotFound(*job_id));
        }

        tracing::info!(
            job_id = %job_id,
            removed_tasks = deletion.removed_tasks,
            in_flight = deletion.in_flight.len(),
            "Job deleted"
        );
        Ok(deletion)
    }

    /// Archival has no defined target location yet. The job must exist; the
    /// call then reports `Unsupported` and leaves everything in place.
    pub fn archive_job(&self, job_id: &JobId) -> Result<()> {
        self.read_job(job_id)?;
        tracing::warn!(job_id = %job_id, "Job archival is not supported");
        Err(QueueError::Unsupported("job archival"))
    }
}

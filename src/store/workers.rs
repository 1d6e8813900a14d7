use std::fs;
use std::io;

use crate::error::{QueueError, Result};
use crate::model::task::parse_task_file_name;
use crate::model::{JobId, NewWorker, WorkerId, WorkerRecord};
use crate::store::layout::WORKER_INFO_FILE;
use crate::store::records::{read_record, write_record};
use crate::store::RenderQueue;

/// Outcome of [`RenderQueue::delete_worker`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerRemoval {
    pub worker_id: WorkerId,
    /// Tasks that were still in the worker's claim area and are now gone.
    pub abandoned: Vec<(JobId, u32)>,
}

impl RenderQueue {
    /// Register a worker: creates its namespace (which doubles as its claim
    /// area) and writes its info record.
    pub fn create_worker(&self, new: NewWorker) -> Result<WorkerId> {
        let worker_id = WorkerId::new();
        let dir = self.layout().worker_dir(&worker_id);
        fs::create_dir(&dir).map_err(|e| QueueError::storage(&dir, e))?;

        let record = WorkerRecord {
            id: worker_id,
            name: new.name,
            hostname: new.hostname,
            status: new.status,
            extra: new.extra,
        };
        write_record(&self.layout().worker_info_file(&worker_id), &record)?;

        tracing::info!(worker_id = %worker_id, name = %record.name, "Worker registered");
        Ok(worker_id)
    }

    pub fn worker_exists(&self, worker_id: &WorkerId) -> bool {
        self.layout().worker_dir(worker_id).is_dir()
    }

    pub fn read_worker(&self, worker_id: &WorkerId) -> Result<WorkerRecord> {
        read_record(&self.layout().worker_info_file(worker_id))?
            .ok_or(QueueError::WorkerNotFound(*worker_id))
    }

    /// All registered workers, sorted by name. Unreadable records are skipped
    /// with a warning.
    pub fn list_workers(&self) -> Result<Vec<WorkerRecord>> {
        let dir = self.layout().workers_dir();
        let entries = fs::read_dir(dir).map_err(|e| QueueError::storage(dir, e))?;

        let mut workers = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            if !entry.path().is_dir() {
                continue;
            }
            let path = entry.path().join(WORKER_INFO_FILE);
            match read_record::<WorkerRecord>(&path) {
                Ok(Some(worker)) => workers.push(worker),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Error reading worker"),
            }
        }
        workers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(workers)
    }

    /// Task records currently in the worker's claim area.
    pub fn claimed_tasks(&self, worker_id: &WorkerId) -> Result<Vec<(JobId, u32)>> {
        let dir = self.layout().worker_dir(worker_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(QueueError::WorkerNotFound(*worker_id))
            }
            Err(e) => return Err(QueueError::storage(&dir, e)),
        };

        let mut claimed: Vec<(JobId, u32)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_task_file_name))
            .collect();
        claimed.sort();
        Ok(claimed)
    }

    /// Deregister a worker, removing its namespace and claim area.
    ///
    /// Anything still claimed there is lost; use
    /// [`RenderQueue::requeue_worker_tasks`] first to rescue it.
    pub fn delete_worker(&self, worker_id: &WorkerId) -> Result<WorkerRemoval> {
        let abandoned = self.claimed_tasks(worker_id)?;
        for (job_id, task_no) in &abandoned {
            tracing::warn!(
                worker_id = %worker_id,
                job_id = %job_id,
                task_no,
                "Abandoning task claimed by deleted worker"
            );
        }

        let dir = self.layout().worker_dir(worker_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(QueueError::WorkerNotFound(*worker_id))
            }
            Err(e) => return Err(QueueError::storage(&dir, e)),
        }

        tracing::info!(worker_id = %worker_id, abandoned = abandoned.len(), "Worker deleted");
        Ok(WorkerRemoval {
            worker_id: *worker_id,
            abandoned,
        })
    }

    pub fn worker_status(&self, worker_id: &WorkerId) -> Result<String> {
        Ok(self.read_worker(worker_id)?.status)
    }

    /// Set a worker's status. Returns `false` without writing if it is
    /// already `status`.
    pub fn set_worker_status(&self, worker_id: &WorkerId, status: &str) -> Result<bool> {
        let mut worker = self.read_worker(worker_id)?;
        if worker.status == status {
            return Ok(false);
        }

        tracing::info!(worker_id = %worker_id, from = %worker.status, to = status, "Worker status changed");
        worker.status = status.to_string();
        write_record(&self.layout().worker_info_file(worker_id), &worker)?;
        Ok(true)
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{QueueError, Result};
use crate::model::task::{parse_task_file_name, task_file_name, TASK_FILE_EXT};
use crate::model::{JobId, TaskRecord};
use crate::state::TaskState;
use crate::store::layout::Area;
use crate::store::records::read_record;
use crate::store::RenderQueue;

/// Where a task record was found.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskLocation {
    pub job_id: JobId,
    pub task_no: u32,
    pub area: Area,
    pub path: PathBuf,
}

impl TaskLocation {
    pub fn state(&self) -> Option<TaskState> {
        self.area.state()
    }
}

/// A task record together with the state derived from its location.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
    pub record: TaskRecord,
    pub state: TaskState,
}

impl TaskView {
    pub fn status(&self) -> &'static str {
        self.state.label()
    }
}

impl RenderQueue {
    /// Find the record files of one task, or of every task of a job when
    /// `task_no` is `None`, across all areas.
    ///
    /// The scan is a single glob over `<root>/*/*/`, so its cost grows with
    /// the number of workers, not with the number of tasks.
    pub(crate) fn find_task_files(
        &self,
        job_id: &JobId,
        task_no: Option<u32>,
    ) -> Result<Vec<TaskLocation>> {
        let name = match task_no {
            Some(task_no) => task_file_name(job_id, task_no),
            None => format!("{}_*.{}", job_id, TASK_FILE_EXT),
        };
        let root = glob::Pattern::escape(&self.layout().root().to_string_lossy());
        let pattern = format!("{}/*/*/{}", root, name);

        let paths = glob::glob(&pattern)
            .map_err(|e| QueueError::Internal(format!("invalid pattern {}: {}", pattern, e)))?;

        let mut found = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable queue path");
                    continue;
                }
            };
            let Some(area) = self.layout().classify(&path) else {
                continue;
            };
            let Some((found_job, found_task)) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(parse_task_file_name)
            else {
                continue;
            };
            if found_job != *job_id {
                continue;
            }
            found.push(TaskLocation {
                job_id: found_job,
                task_no: found_task,
                area,
                path,
            });
        }
        Ok(found)
    }

    /// Locate a single task record.
    pub fn locate_task(&self, job_id: &JobId, task_no: u32) -> Result<Option<TaskLocation>> {
        let mut found = self.find_task_files(job_id, Some(task_no))?;
        if found.len() > 1 {
            tracing::warn!(
                job_id = %job_id,
                task_no,
                copies = found.len(),
                "Task record found in more than one area"
            );
        }
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Current state of a task. A task parked by the editor reports
    /// `RaceLost`: it will be back in a state area shortly.
    pub fn task_state(&self, job_id: &JobId, task_no: u32) -> Result<TaskState> {
        let location = self
            .locate_task(job_id, task_no)?
            .ok_or(QueueError::TaskNotFound {
                job_id: *job_id,
                task_no,
            })?;
        location.state().ok_or(QueueError::RaceLost {
            job_id: *job_id,
            task_no,
        })
    }

    pub fn read_task(&self, job_id: &JobId, task_no: u32) -> Result<TaskView> {
        let not_found = || QueueError::TaskNotFound {
            job_id: *job_id,
            task_no,
        };
        let location = self.locate_task(job_id, task_no)?.ok_or_else(not_found)?;
        let state = location.state().ok_or(QueueError::RaceLost {
            job_id: *job_id,
            task_no,
        })?;
        let record = read_record(&location.path)?.ok_or_else(not_found)?;
        Ok(TaskView { record, state })
    }

    /// Every task of a job with its status, ordered by task number.
    ///
    /// Records that move or turn out unreadable during the scan are left out.
    pub fn list_tasks(&self, job_id: &JobId) -> Result<Vec<TaskView>> {
        let mut tasks = Vec::new();
        for location in self.find_task_files(job_id, None)? {
            let Some(state) = location.state() else {
                continue;
            };
            match read_record::<TaskRecord>(&location.path) {
                Ok(Some(record)) => tasks.push(TaskView { record, state }),
                Ok(None) => {
                    tracing::debug!(path = %location.path.display(), "Task moved during listing");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable task record");
                }
            }
        }
        tasks.sort_by_key(|task| task.record.task_no);
        Ok(tasks)
    }

    /// Queued task numbers of one job, ascending.
    pub fn queued_tasks(&self, job_id: &JobId) -> Result<Vec<u32>> {
        Ok(self.queued_index()?.remove(job_id).unwrap_or_default())
    }

    /// Queued task numbers of every job, each list ascending. Built from file
    /// names alone, without opening any record.
    pub(crate) fn queued_index(&self) -> Result<HashMap<JobId, Vec<u32>>> {
        let dir = self.layout().area_dir(&Area::Queued);
        let entries = fs::read_dir(&dir).map_err(|e| QueueError::storage(&dir, e))?;

        let mut index: HashMap<JobId, Vec<u32>> = HashMap::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some((job_id, task_no)) = name.to_str().and_then(parse_task_file_name) else {
                continue;
            };
            index.entry(job_id).or_default().push(task_no);
        }
        for tasks in index.values_mut() {
            tasks.sort_unstable();
        }
        Ok(index)
    }
}

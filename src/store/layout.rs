use std::path::{Path, PathBuf};

use crate::model::task::task_file_name;
use crate::model::{JobId, WorkerId};
use crate::state::TaskState;

pub const JOBS_DIR: &str = "jobs";
pub const TASKS_DIR: &str = "tasks";
pub const QUEUED_DIR: &str = "queued";
pub const COMPLETED_DIR: &str = "completed";
pub const FAILED_DIR: &str = "failed";
pub const EDITING_DIR: &str = "editing";
pub const WORKERS_DIR: &str = "workers";
pub const WORKER_INFO_FILE: &str = "workerinfo.json";

/// A directory that can hold task records.
///
/// Every area except `Editing` corresponds to a [`TaskState`]. `Editing` is
/// where the task editor parks records it is rewriting so that no worker can
/// claim them mid-edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Queued,
    Completed,
    Failed,
    Editing,
    Claim(WorkerId),
}

impl Area {
    pub fn for_state(state: &TaskState) -> Self {
        match state {
            TaskState::Queued => Area::Queued,
            TaskState::Working(worker) => Area::Claim(*worker),
            TaskState::Completed => Area::Completed,
            TaskState::Failed => Area::Failed,
        }
    }

    pub fn state(&self) -> Option<TaskState> {
        match self {
            Area::Queued => Some(TaskState::Queued),
            Area::Completed => Some(TaskState::Completed),
            Area::Failed => Some(TaskState::Failed),
            Area::Claim(worker) => Some(TaskState::Working(*worker)),
            Area::Editing => None,
        }
    }
}

/// Physical paths of the queue directory tree.
///
/// ```text
/// <root>/jobs/<jobID>.json
/// <root>/tasks/{queued,completed,failed,editing}/<jobID>_<NNNN>.json
/// <root>/workers/<workerID>/workerinfo.json
/// <root>/workers/<workerID>/<jobID>_<NNNN>.json
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    jobs: PathBuf,
    queued: PathBuf,
    completed: PathBuf,
    failed: PathBuf,
    editing: PathBuf,
    workers: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let tasks = root.join(TASKS_DIR);
        Self {
            jobs: root.join(JOBS_DIR),
            queued: tasks.join(QUEUED_DIR),
            completed: tasks.join(COMPLETED_DIR),
            failed: tasks.join(FAILED_DIR),
            editing: tasks.join(EDITING_DIR),
            workers: root.join(WORKERS_DIR),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories that must exist before the queue is usable.
    pub fn directories(&self) -> [&Path; 6] {
        [
            &self.jobs,
            &self.queued,
            &self.completed,
            &self.failed,
            &self.editing,
            &self.workers,
        ]
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs
    }

    pub fn job_file(&self, job_id: &JobId) -> PathBuf {
        self.jobs.join(format!("{}.json", job_id))
    }

    pub fn workers_dir(&self) -> &Path {
        &self.workers
    }

    pub fn worker_dir(&self, worker_id: &WorkerId) -> PathBuf {
        self.workers.join(worker_id.to_string())
    }

    pub fn worker_info_file(&self, worker_id: &WorkerId) -> PathBuf {
        self.worker_dir(worker_id).join(WORKER_INFO_FILE)
    }

    pub fn area_dir(&self, area: &Area) -> PathBuf {
        match area {
            Area::Queued => self.queued.clone(),
            Area::Completed => self.completed.clone(),
            Area::Failed => self.failed.clone(),
            Area::Editing => self.editing.clone(),
            Area::Claim(worker) => self.worker_dir(worker),
        }
    }

    pub fn task_file(&self, area: &Area, job_id: &JobId, task_no: u32) -> PathBuf {
        self.area_dir(area).join(task_file_name(job_id, task_no))
    }

    /// Work out which area a task record path belongs to.
    pub fn classify(&self, path: &Path) -> Option<Area> {
        let dir = path.parent()?;
        if dir == self.queued {
            Some(Area::Queued)
        } else if dir == self.completed {
            Some(Area::Completed)
        } else if dir == self.failed {
            Some(Area::Failed)
        } else if dir == self.editing {
            Some(Area::Editing)
        } else if dir.parent()? == self.workers {
            let worker = dir.file_name()?.to_str()?.parse().ok()?;
            Some(Area::Claim(worker))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_round_trips_every_area() {
        let layout = Layout::new("/farm/queue");
        let job_id = JobId::new();
        let worker = WorkerId::new();

        for area in [
            Area::Queued,
            Area::Completed,
            Area::Failed,
            Area::Editing,
            Area::Claim(worker),
        ] {
            let path = layout.task_file(&area, &job_id, 2);
            assert_eq!(layout.classify(&path), Some(area));
        }
    }

    #[test]
    fn classify_ignores_foreign_paths() {
        let layout = Layout::new("/farm/queue");
        assert_eq!(layout.classify(Path::new("/farm/queue/jobs/x.json")), None);
        assert_eq!(
            layout.classify(Path::new("/farm/queue/workers/not-an-id/x.json")),
            None
        );
    }

    #[test]
    fn areas_map_to_states() {
        let worker = WorkerId::new();
        assert_eq!(Area::Editing.state(), None);
        assert_eq!(
            Area::for_state(&TaskState::Working(worker)),
            Area::Claim(worker)
        );
        assert_eq!(Area::Failed.state(), Some(TaskState::Failed));
    }
}

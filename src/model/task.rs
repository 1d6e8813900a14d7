use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::frames::FrameSet;
use crate::model::ids::JobId;

pub const TASK_FILE_EXT: &str = "json";

/// A unit of work belonging to a job. Its state is wherever its file lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "jobID")]
    pub job_id: JobId,
    #[serde(rename = "taskNo")]
    pub task_no: u32,
    pub frames: String,
    /// Fields written by other collaborators, preserved on rewrite.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TaskRecord {
    pub fn new(job_id: JobId, task_no: u32, frames: impl Into<String>) -> Self {
        Self {
            job_id,
            task_no,
            frames: frames.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn frame_set(&self) -> Result<FrameSet> {
        self.frames.parse()
    }
}

/// What a worker reports alongside a completed or failed task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskReport {
    pub worker: Option<String>,
    pub elapsed: Option<Duration>,
}

impl TaskReport {
    pub fn new(worker: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            worker: Some(worker.into()),
            elapsed: Some(elapsed),
        }
    }
}

/// `<jobID>_<NNNN>.json`
pub fn task_file_name(job_id: &JobId, task_no: u32) -> String {
    format!("{}_{:04}.{}", job_id, task_no, TASK_FILE_EXT)
}

/// Inverse of [`task_file_name`].
pub fn parse_task_file_name(name: &str) -> Option<(JobId, u32)> {
    let stem = name.strip_suffix(TASK_FILE_EXT)?.strip_suffix('.')?;
    let (job, task) = stem.split_once('_')?;
    if task.is_empty() || !task.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((job.parse().ok()?, task.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_zero_padded() {
        let job_id = JobId::new();
        let name = task_file_name(&job_id, 7);
        assert_eq!(name, format!("{}_0007.json", job_id));
        assert_eq!(parse_task_file_name(&name), Some((job_id, 7)));
    }

    #[test]
    fn wide_task_numbers_still_parse() {
        let job_id = JobId::new();
        let name = task_file_name(&job_id, 12345);
        assert_eq!(parse_task_file_name(&name), Some((job_id, 12345)));
    }

    #[test]
    fn parse_rejects_foreign_files() {
        assert_eq!(parse_task_file_name("workerinfo.json"), None);
        assert_eq!(parse_task_file_name(".tmpXYZ"), None);
        let job_id = JobId::new();
        assert_eq!(parse_task_file_name(&format!("{}_x1.json", job_id)), None);
        assert_eq!(parse_task_file_name(&format!("{}_0001.txt", job_id)), None);
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let job_id = JobId::new();
        let raw = serde_json::json!({
            "jobID": job_id.to_string(),
            "taskNo": 3,
            "frames": "Unknown",
            "command": "hython render.py",
        });

        let task: TaskRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(task.task_no, 3);
        assert!(task.frame_set().unwrap().is_unknown());

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["command"], "hython render.py");
        assert_eq!(value["taskNo"], 3);
    }
}

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{JobId, WorkerId};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Task not found: job {job_id} task {task_no}")]
    TaskNotFound { job_id: JobId, task_no: u32 },

    #[error("Worker not found: {0}")]
    WorkerNotFound(WorkerId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Combined frame range {start}-{end} has gaps ({count} frames)")]
    NonContiguousRange { start: i64, end: i64, count: usize },

    #[error("Cannot {transition} a task that is {from}")]
    InvalidTransition { from: String, transition: String },

    /// The record moved between lookup and rename, usually because another
    /// worker claimed it first.
    #[error("Lost race for job {job_id} task {task_no}")]
    RaceLost { job_id: JobId, task_no: u32 },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QueueError::Storage {
            path: path.into(),
            source,
        }
    }

    /// True for the `NotFound` family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QueueError::JobNotFound(_)
                | QueueError::TaskNotFound { .. }
                | QueueError::WorkerNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;

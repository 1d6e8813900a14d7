use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};
use crate::model::ids::JobId;

pub const MIN_PRIORITY: u8 = 0;
pub const MAX_PRIORITY: u8 = 100;
pub const DEFAULT_PRIORITY: u8 = 50;

/// Check that `value` lies in `[0, 100]`.
pub fn validate_priority(value: i64) -> Result<u8> {
    if (i64::from(MIN_PRIORITY)..=i64::from(MAX_PRIORITY)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(QueueError::InvalidArgument(format!(
            "priority {} outside {}..={}",
            value, MIN_PRIORITY, MAX_PRIORITY
        )))
    }
}

/// A submitted render job, stored as `jobs/<jobID>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "jobID")]
    pub id: JobId,
    #[serde(rename = "jobName")]
    pub name: String,
    pub priority: u8,
    #[serde(rename = "jobType", default)]
    pub job_type: String,
    /// Frame sets used to seed the tasks at submission time.
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(rename = "submitTime", default)]
    pub submitted_at: DateTime<Utc>,
    /// One past the highest task number ever handed out for this job.
    /// Task numbers are never reused, even after the task is deleted.
    #[serde(rename = "nextTaskNo", default)]
    pub next_task_no: u32,
    /// Type-specific parameters (command, flags, scene, ...) kept verbatim.
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

/// Fields supplied by a submitter when creating a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub job_type: String,
    pub priority: i64,
    pub tasks: Vec<String>,
    pub params: BTreeMap<String, serde_json::Value>,
}

impl NewJob {
    pub fn new(name: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            job_type: job_type.into(),
            priority: i64::from(DEFAULT_PRIORITY),
            tasks: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_task(mut self, frames: impl Into<String>) -> Self {
        self.tasks.push(frames.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

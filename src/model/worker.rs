use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::WorkerId;

/// Conventional status values. The queue stores whatever the worker sets.
pub mod status {
    pub const IDLE: &str = "idle";
    pub const DISABLED: &str = "disabled";
    pub const RENDERING: &str = "rendering";
}

/// A registered worker, stored as `workers/<id>/workerinfo.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    pub status: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewWorker {
    pub name: String,
    pub hostname: String,
    pub status: String,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NewWorker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: String::new(),
            status: status::IDLE.to_string(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

//! Record store over the shared queue directory.
//!
//! [`RenderQueue`] is the handle every collaborator uses. It holds no state
//! besides paths and settings: all coordination between processes happens
//! through the directory tree, so any number of handles (in any number of
//! processes) can point at the same root.

pub mod jobs;
pub mod layout;
pub mod records;
pub mod tasks;
pub mod workers;

use std::fs;

use crate::config::QueueConfig;
use crate::error::{QueueError, Result};

pub use jobs::JobDeletion;
pub use layout::{Area, Layout};
pub use tasks::{TaskLocation, TaskView};
pub use workers::WorkerRemoval;

#[derive(Debug, Clone)]
pub struct RenderQueue {
    config: QueueConfig,
    layout: Layout,
}

impl RenderQueue {
    /// Connect to the queue at `config.root`, creating the directory
    /// structure if it does not exist yet.
    pub fn open(config: QueueConfig) -> Result<Self> {
        fs::create_dir_all(&config.root).map_err(|e| QueueError::storage(&config.root, e))?;
        let root = fs::canonicalize(&config.root).map_err(|e| QueueError::storage(&config.root, e))?;

        let layout = Layout::new(root);
        for dir in layout.directories() {
            fs::create_dir_all(dir).map_err(|e| QueueError::storage(dir, e))?;
        }

        tracing::info!(root = %layout.root().display(), "Connected to render queue");
        Ok(Self { config, layout })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

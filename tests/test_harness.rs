//! Shared fixtures for queue integration tests.
//!
//! Every test gets its own queue rooted in a fresh temporary directory; the
//! `TempDir` must stay alive for as long as the queue is used.

#![allow(dead_code)]

use std::time::Duration;

use render_queue::model::{JobId, NewJob, NewWorker, WorkerId};
use render_queue::{QueueConfig, RenderQueue};
use tempfile::TempDir;

pub struct TestQueue {
    pub dir: TempDir,
    pub queue: RenderQueue,
}

impl TestQueue {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    pub fn with_config(adjust: impl FnOnce(QueueConfig) -> QueueConfig) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let queue = RenderQueue::open(adjust(QueueConfig::new(dir.path()))).expect("open queue");
        Self { dir, queue }
    }

    /// Another handle on the same root, as a second process would have.
    pub fn reopen(&self) -> RenderQueue {
        RenderQueue::open(QueueConfig::new(self.dir.path())).expect("reopen queue")
    }

    pub fn submit(&self, name: &str, priority: i64, frames: &[&str]) -> JobId {
        let mut job = NewJob::new(name, "Maya").with_priority(priority);
        for frames in frames {
            job = job.with_task(*frames);
        }
        self.queue.create_job(job).expect("submit job")
    }

    pub fn register(&self, name: &str) -> WorkerId {
        self.queue
            .create_worker(NewWorker::new(name).with_hostname("render01"))
            .expect("register worker")
    }

    /// Task numbers of `job_id` paired with their status labels.
    pub fn statuses(&self, job_id: &JobId) -> Vec<(u32, &'static str)> {
        self.queue
            .list_tasks(job_id)
            .expect("list tasks")
            .iter()
            .map(|view| (view.record.task_no, view.status()))
            .collect()
    }

    /// Frame strings of `job_id`'s tasks in task-number order.
    pub fn frames(&self, job_id: &JobId) -> Vec<(u32, String)> {
        self.queue
            .list_tasks(job_id)
            .expect("list tasks")
            .into_iter()
            .map(|view| (view.record.task_no, view.record.frames))
            .collect()
    }
}

/// Submission timestamps have sub-millisecond resolution, but keep test
/// orderings unambiguous.
pub fn tick() {
    std::thread::sleep(Duration::from_millis(5));
}

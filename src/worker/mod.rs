//! Worker-side helpers for pulling work off the queue.
//!
//! - [`TaskPoller`]: waits for the next claimable task on an interval,
//!   honouring the worker's disabled status and a shutdown token.
//!
//! Rendering itself is out of scope: a worker claims a task, runs whatever
//! renderer the job's `jobType` calls for, then reports back through
//! [`RenderQueue::complete_task`](crate::store::RenderQueue::complete_task)
//! or [`RenderQueue::fail_task`](crate::store::RenderQueue::fail_task).

pub mod poller;

pub use poller::TaskPoller;

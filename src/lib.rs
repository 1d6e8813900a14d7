//! A render farm job queue coordinated entirely through a shared directory.
//!
//! Submitters, schedulers, workers and operator tools all open a
//! [`RenderQueue`] on the same root and cooperate through atomic renames:
//! a task's state is the directory its record file sits in.

pub mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod shutdown;
pub mod state;
pub mod store;
pub mod worker;

pub use config::QueueConfig;
pub use error::{QueueError, Result};
pub use store::RenderQueue;

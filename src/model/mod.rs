//! Records persisted in the queue directory tree.
//!
//! Field names are part of the on-disk format shared with the GUI and render
//! collaborators, so every record keeps the established camelCase keys.

pub mod frames;
pub mod ids;
pub mod job;
pub mod task;
pub mod worker;

pub use frames::FrameSet;
pub use ids::{JobId, WorkerId};
pub use job::{JobRecord, NewJob};
pub use task::{TaskRecord, TaskReport};
pub use worker::{NewWorker, WorkerRecord};

//! Choosing the next task for a worker.
//!
//! There is no scheduler process: every worker runs the selection itself
//! against the shared tree and relies on the atomic claim rename to settle
//! conflicts with other workers.

pub mod dequeue;

pub use dequeue::{schedule_order, ClaimedTask};

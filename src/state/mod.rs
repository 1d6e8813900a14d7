//! Task lifecycle.
//!
//! A task's state is the directory holding its record. [`machine`] is the
//! transition table as plain data; [`relocate`] applies it to the directory
//! tree with atomic renames.

pub mod machine;
pub mod relocate;

pub use machine::{TaskState, Transition};

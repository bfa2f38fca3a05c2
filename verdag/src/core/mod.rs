//! Task primitives: identities, bodies, outcomes, and graph nodes.

mod outcome;
mod task;

pub use outcome::{TaskOutcome, TaskStatus};
pub use task::{FnTask, NoOpTask, TaskBody, TaskId, TaskNode, TaskRef};

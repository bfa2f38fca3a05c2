//! Task-graph expressions and the flattening combinator.

mod combinator;
mod expr;

pub use combinator::{connect, TaskSet, Tasks};
pub use expr::TaskGraph;

//! The task-graph expression type.

use crate::core::TaskRef;

/// A recursive expression describing how tasks are composed.
///
/// `Parallel` members run concurrently with no ordering implied among
/// them; `Sequential` members run in order, with every task of element
/// `i` finishing before any task of element `i + 1` starts. The tagged
/// representation makes the combinator's case analysis exhaustive, in
/// place of the set-vs-tuple convention this API descends from.
#[derive(Debug, Clone)]
pub enum TaskGraph {
    /// A single task.
    Leaf(TaskRef),
    /// Sub-expressions with no mutual ordering.
    Parallel(Vec<TaskGraph>),
    /// Sub-expressions executed one after another.
    Sequential(Vec<TaskGraph>),
}

impl TaskGraph {
    /// Wraps a single task.
    #[must_use]
    pub fn leaf(task: TaskRef) -> Self {
        Self::Leaf(task)
    }

    /// Builds a parallel group.
    #[must_use]
    pub fn parallel(members: impl IntoIterator<Item = impl Into<TaskGraph>>) -> Self {
        Self::Parallel(members.into_iter().map(Into::into).collect())
    }

    /// Builds a sequential chain.
    #[must_use]
    pub fn sequential(members: impl IntoIterator<Item = impl Into<TaskGraph>>) -> Self {
        Self::Sequential(members.into_iter().map(Into::into).collect())
    }

    /// Returns true if the expression contains no tasks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Leaf(_) => false,
            Self::Parallel(members) | Self::Sequential(members) => {
                members.iter().all(TaskGraph::is_empty)
            }
        }
    }
}

impl From<TaskRef> for TaskGraph {
    fn from(task: TaskRef) -> Self {
        Self::Leaf(task)
    }
}

impl From<&TaskRef> for TaskGraph {
    fn from(task: &TaskRef) -> Self {
        Self::Leaf(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NoOpTask, TaskNode};

    #[test]
    fn test_is_empty() {
        assert!(TaskGraph::Parallel(vec![]).is_empty());
        assert!(TaskGraph::Sequential(vec![TaskGraph::Parallel(vec![])]).is_empty());

        let task = TaskNode::new("a", NoOpTask);
        assert!(!TaskGraph::leaf(task.clone()).is_empty());
        assert!(!TaskGraph::sequential([task]).is_empty());
    }
}

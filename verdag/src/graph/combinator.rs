//! Flattening a [`TaskGraph`] into entry/last/all task sets.

use super::TaskGraph;
use crate::core::{TaskId, TaskNode, TaskRef};
use std::collections::HashMap;

/// An identity-keyed set of task handles.
///
/// Keyed by [`TaskId`], so inserting the same node twice is a no-op and
/// flattening is idempotent.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: HashMap<TaskId, TaskRef>,
}

impl TaskSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a task handle.
    pub fn insert(&mut self, task: TaskRef) {
        self.tasks.insert(task.id(), task);
    }

    /// Merges all tasks from `other` into this set.
    pub fn extend(&mut self, other: &TaskSet) {
        for task in other.iter() {
            self.insert(task.clone());
        }
    }

    /// Returns the number of tasks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the set contains no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns true if the set contains the given task.
    #[must_use]
    pub fn contains(&self, task: &TaskNode) -> bool {
        self.tasks.contains_key(&task.id())
    }

    /// Iterates over the task handles.
    pub fn iter(&self) -> impl Iterator<Item = &TaskRef> {
        self.tasks.values()
    }

    /// Returns the sole member, if the set has exactly one.
    #[must_use]
    pub fn sole(&self) -> Option<&TaskRef> {
        if self.tasks.len() == 1 {
            self.tasks.values().next()
        } else {
            None
        }
    }
}

impl FromIterator<TaskRef> for TaskSet {
    fn from_iter<I: IntoIterator<Item = TaskRef>>(iter: I) -> Self {
        let mut set = Self::new();
        for task in iter {
            set.insert(task);
        }
        set
    }
}

/// The result of flattening a task-graph expression.
#[derive(Debug, Clone, Default)]
pub struct Tasks {
    /// Tasks with no predecessor inside this graph.
    pub first: TaskSet,
    /// Tasks with no successor inside this graph.
    pub last: TaskSet,
    /// Every task in the graph.
    pub all: TaskSet,
}

impl Tasks {
    fn single(task: TaskRef) -> Self {
        let set: TaskSet = [task].into_iter().collect();
        Self {
            first: set.clone(),
            last: set.clone(),
            all: set,
        }
    }
}

/// Connects a task-graph expression into a flattened graph.
///
/// Parallel members are unioned with no edges added between them.
/// Sequential members get a complete bipartite barrier between each
/// adjacent pair: every task in the left member's `last` set precedes
/// every task in the right member's `first` set. The only side effect
/// is edge creation on the existing nodes; re-running on the same nodes
/// never duplicates an edge.
#[must_use]
pub fn connect(graph: TaskGraph) -> Tasks {
    match graph {
        TaskGraph::Leaf(task) => Tasks::single(task),
        TaskGraph::Parallel(members) => {
            let mut combined = Tasks::default();
            for member in members {
                let result = connect(member);
                combined.first.extend(&result.first);
                combined.last.extend(&result.last);
                combined.all.extend(&result.all);
            }
            combined
        }
        TaskGraph::Sequential(members) => {
            let results: Vec<Tasks> = members.into_iter().map(connect).collect();
            let Some((head, tail)) = results.split_first() else {
                return Tasks::default();
            };
            for pair in results.windows(2) {
                for last in pair[0].last.iter() {
                    for first in pair[1].first.iter() {
                        last.set_downstream(first);
                    }
                }
            }
            let mut all = TaskSet::new();
            for result in &results {
                all.extend(&result.all);
            }
            Tasks {
                first: head.first.clone(),
                last: tail.last().unwrap_or(head).last.clone(),
                all,
            }
        }
    }
}

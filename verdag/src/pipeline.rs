//! Pipeline assembly: the global task collection handed to the
//! orchestrator.

use crate::core::{TaskId, TaskRef};
use crate::unit::Unit;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default scheduling parameters applied to tasks at insertion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagDefaults {
    /// Start date given to tasks that did not set one explicitly.
    pub start_date: DateTime<Utc>,
}

impl Default for DagDefaults {
    fn default() -> Self {
        Self {
            start_date: Utc::now() - Duration::days(1),
        }
    }
}

/// The global collection of atomic tasks for one pipeline.
///
/// Units are inserted in dependency order (their constructor already
/// forces that order); the dag applies still-missing scheduling
/// defaults and otherwise holds the fully wired task set for the
/// orchestrator to schedule.
#[derive(Debug, Default)]
pub struct Dag {
    name: String,
    defaults: DagDefaults,
    tasks: HashMap<TaskId, TaskRef>,
}

impl Dag {
    /// Creates an empty dag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: DagDefaults::default(),
            tasks: HashMap::new(),
        }
    }

    /// Replaces the scheduling defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: DagDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Returns the dag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a task, applying defaults for unset scheduling
    /// parameters. Re-inserting a task is a no-op.
    pub fn add_task(&mut self, task: TaskRef) {
        if task.start_date().is_none() {
            task.set_start_date(self.defaults.start_date);
        }
        self.tasks.insert(task.id(), task);
    }

    /// Inserts several tasks.
    pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = TaskRef>) {
        for task in tasks {
            self.add_task(task);
        }
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&TaskRef> {
        self.tasks.get(&id)
    }

    /// Returns true if the dag contains the task.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the dag holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over the task handles.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskRef> {
        self.tasks.values()
    }
}

impl Unit {
    /// Inserts every task of this unit into the dag.
    pub fn insert_into(&self, dag: &mut Dag) {
        dag.add_tasks(self.tasks().all.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NoOpTask, TaskNode};

    #[test]
    fn test_add_task_applies_default_start_date() {
        let mut dag = Dag::new("pipeline");
        let task = TaskNode::new("a", NoOpTask);
        assert!(task.start_date().is_none());

        dag.add_task(task.clone());
        assert!(task.start_date().is_some());
    }

    #[test]
    fn test_add_task_keeps_explicit_start_date() {
        let explicit = Utc::now();
        let mut dag = Dag::new("pipeline").with_defaults(DagDefaults {
            start_date: explicit - Duration::days(7),
        });

        let task = TaskNode::new("a", NoOpTask);
        task.set_start_date(explicit);
        dag.add_task(task.clone());

        assert_eq!(task.start_date(), Some(explicit));
    }

    #[test]
    fn test_reinsert_is_noop() {
        let mut dag = Dag::new("pipeline");
        let task = TaskNode::new("a", NoOpTask);
        dag.add_task(task.clone());
        dag.add_task(task);
        assert_eq!(dag.len(), 1);
    }
}

//! Versioned units of pipeline work.
//!
//! A [`Unit`] is a named, versioned piece of work defined by a task
//! expression and a list of other units it depends on. Construction
//! flattens the expression, guarantees a single terminal task, wraps
//! every task with version-check/skip/record behavior, and wires the
//! unit's entry tasks after each dependency's terminal task.

mod guard;

use guard::{GuardContext, VersionGuard};

use crate::core::{NoOpTask, TaskNode, TaskRef};
use crate::errors::VerdagError;
use crate::graph::{connect, TaskGraph, Tasks};
use crate::registry::Registry;
use std::sync::Arc;

/// A named, versioned unit of work.
#[derive(Debug)]
pub struct Unit {
    name: String,
    version: String,
    dependencies: Vec<Arc<Unit>>,
    tasks: Tasks,
    terminal: TaskRef,
}

impl Unit {
    /// Constructs a unit from a task expression.
    ///
    /// Dependencies must already be constructed, which forces callers
    /// into topological construction order. The given slice is copied;
    /// later changes to the caller's list do not affect the unit.
    ///
    /// If the flattened expression has more than one terminal task, a
    /// no-op `update-{name}-version` join task is appended so that the
    /// unit exposes exactly one task whose success marks the version
    /// complete. Every task body (the join included) is replaced by a
    /// wrapper that consults `registry` before running, and the
    /// terminal task's wrapper records the completion afterwards.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        dependencies: &[Arc<Unit>],
        expression: impl Into<TaskGraph>,
        registry: Arc<dyn Registry>,
    ) -> Result<Arc<Self>, VerdagError> {
        let name = name.into();
        let version = version.into();
        let dependencies = dependencies.to_vec();

        let mut tasks = connect(expression.into());
        if tasks.all.is_empty() {
            return Err(VerdagError::InvalidGraphExpression(format!(
                "unit '{name}' has an empty task expression"
            )));
        }
        if tasks.first.is_empty() {
            return Err(VerdagError::InvalidGraphExpression(format!(
                "unit '{name}' flattens to no entry tasks; its tasks would be unreachable"
            )));
        }

        if tasks.last.len() > 1 {
            // A single final task is needed because completion must be
            // recorded exactly once, and with several terminal tasks
            // there is no task known to finish last.
            let join = TaskNode::new(format!("update-{name}-version"), NoOpTask);
            for last in tasks.last.iter() {
                last.set_downstream(&join);
            }
            tasks.all.insert(join.clone());
            tasks.last = [join].into_iter().collect();
        }

        let Some(terminal) = tasks.last.sole().cloned() else {
            return Err(VerdagError::AmbiguousTerminal {
                name,
                count: tasks.last.len(),
            });
        };

        let ctx = Arc::new(GuardContext {
            name: name.clone(),
            version: version.clone(),
            dependencies: dependencies
                .iter()
                .map(|d| (d.name.clone(), d.version.clone()))
                .collect(),
            registry,
        });
        for task in tasks.all.iter() {
            let records_completion = task.id() == terminal.id();
            let original = task.body();
            task.set_body(Arc::new(VersionGuard::new(
                original,
                Arc::clone(&ctx),
                records_completion,
            )));
        }

        // This unit's work cannot start before every dependency has
        // recorded its completion.
        for dependency in &dependencies {
            for first in tasks.first.iter() {
                dependency.terminal.set_downstream(first);
            }
        }

        tracing::debug!(
            unit = name.as_str(),
            version = version.as_str(),
            tasks = tasks.all.len(),
            dependencies = dependencies.len(),
            "constructed unit"
        );

        Ok(Arc::new(Self {
            name,
            version,
            dependencies,
            tasks,
            terminal,
        }))
    }

    /// Returns the unit name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the units this unit depends on.
    #[must_use]
    pub fn dependencies(&self) -> &[Arc<Unit>] {
        &self.dependencies
    }

    /// Returns the flattened task sets.
    #[must_use]
    pub fn tasks(&self) -> &Tasks {
        &self.tasks
    }

    /// Returns the sole task whose success records this unit's version.
    #[must_use]
    pub fn terminal_task(&self) -> &TaskRef {
        &self.terminal
    }
}

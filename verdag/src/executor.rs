//! In-process reference executor.
//!
//! Runs every task in a [`Dag`] as soon as all of its predecessors have
//! reached a terminal status, with ready tasks executing concurrently.
//! Skips release successors exactly like successes; the first failure
//! stops the run. Production deployments hand the wired task set to an
//! external orchestrator instead; this executor realizes the same
//! execution contract for tests and single-process embedding.

use crate::core::{TaskId, TaskOutcome, TaskRef};
use crate::errors::VerdagError;
use crate::pipeline::Dag;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use tokio::task::JoinHandle;

/// The result of executing a dag.
#[derive(Debug)]
pub struct ExecutionReport {
    /// Per-task outcomes, for every task that ran.
    pub outcomes: HashMap<TaskId, TaskOutcome>,
    /// Whether every executed task finished without failure.
    pub success: bool,
    /// Description of the failure that stopped the run, if any.
    pub error: Option<String>,
}

impl ExecutionReport {
    /// Returns the number of tasks with the given status.
    #[must_use]
    pub fn count(&self, status: crate::core::TaskStatus) -> usize {
        self.outcomes
            .values()
            .filter(|outcome| outcome.status == status)
            .count()
    }
}

/// Executes dags in the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Creates a new executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs every task in the dag, honoring the predecessor edges.
    pub async fn run(&self, dag: &Dag) -> Result<ExecutionReport, VerdagError> {
        let mut outcomes: HashMap<TaskId, TaskOutcome> = HashMap::new();
        let mut active: FuturesUnordered<JoinHandle<(TaskId, TaskOutcome)>> =
            FuturesUnordered::new();

        // Unsatisfied predecessors per task, counting only edges whose
        // other end is part of this dag.
        let mut in_degree: HashMap<TaskId, usize> = dag
            .tasks()
            .map(|task| {
                let count = task
                    .predecessors()
                    .iter()
                    .filter(|id| dag.contains(**id))
                    .count();
                (task.id(), count)
            })
            .collect();

        for task in dag.tasks() {
            if in_degree.get(&task.id()).copied() == Some(0) {
                active.push(spawn_task(task));
            }
        }

        while outcomes.len() < dag.len() {
            if active.is_empty() {
                let pending: Vec<String> = dag
                    .tasks()
                    .filter(|task| !outcomes.contains_key(&task.id()))
                    .map(|task| task.name().to_string())
                    .collect();
                return Err(VerdagError::Internal(format!(
                    "wedged task graph; remaining tasks: {pending:?}"
                )));
            }

            let Some(joined) = active.next().await else {
                continue;
            };
            let (id, outcome) = joined
                .map_err(|e| VerdagError::Internal(format!("task join error: {e}")))?;

            let failed = outcome.is_fail();
            let error = outcome.error.clone();
            outcomes.insert(id, outcome);

            if failed {
                let name = dag.get(id).map_or_else(String::new, |t| t.name().to_string());
                tracing::warn!(task = name.as_str(), "task failed; stopping run");
                return Ok(ExecutionReport {
                    outcomes,
                    success: false,
                    error: Some(format!(
                        "task '{name}' failed: {}",
                        error.unwrap_or_default()
                    )),
                });
            }

            // Skip and success both release successors.
            let Some(task) = dag.get(id) else { continue };
            for successor_id in task.successors() {
                if !dag.contains(successor_id) {
                    continue;
                }
                if let Some(count) = in_degree.get_mut(&successor_id) {
                    *count = count.saturating_sub(1);
                    if *count == 0 && !outcomes.contains_key(&successor_id) {
                        if let Some(successor) = dag.get(successor_id) {
                            active.push(spawn_task(successor));
                        }
                    }
                }
            }
        }

        Ok(ExecutionReport {
            outcomes,
            success: true,
            error: None,
        })
    }
}

fn spawn_task(task: &TaskRef) -> JoinHandle<(TaskId, TaskOutcome)> {
    let id = task.id();
    let name = task.name().to_string();
    let body = task.body();
    tokio::spawn(async move {
        tracing::debug!(task = name.as_str(), "starting task");
        let outcome = body.run().await;
        tracing::debug!(task = name.as_str(), status = ?outcome.status, "task finished");
        (id, outcome)
    })
}

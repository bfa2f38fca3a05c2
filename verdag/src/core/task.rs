//! Task nodes and executable bodies.
//!
//! A [`TaskNode`] is an atomic, named unit of work with identity,
//! predecessor/successor edges, and a swappable executable body. Edges
//! live on the nodes themselves; composition only ever adds forward
//! edges, so the relation stays acyclic by construction.

use super::TaskOutcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh task id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trait for executable task bodies.
#[async_trait]
pub trait TaskBody: Send + Sync + fmt::Debug {
    /// Executes the body, producing an outcome.
    async fn run(&self) -> TaskOutcome;
}

/// A simple function-based task body.
pub struct FnTask<F>
where
    F: Fn() -> TaskOutcome + Send + Sync,
{
    func: F,
}

impl<F> FnTask<F>
where
    F: Fn() -> TaskOutcome + Send + Sync,
{
    /// Creates a new function-based body.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for FnTask<F>
where
    F: Fn() -> TaskOutcome + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask").finish()
    }
}

#[async_trait]
impl<F> TaskBody for FnTask<F>
where
    F: Fn() -> TaskOutcome + Send + Sync,
{
    async fn run(&self) -> TaskOutcome {
        (self.func)()
    }
}

/// A body that does nothing and succeeds.
///
/// Used for synthesized join tasks and in tests.
#[derive(Debug, Clone, Default)]
pub struct NoOpTask;

#[async_trait]
impl TaskBody for NoOpTask {
    async fn run(&self) -> TaskOutcome {
        TaskOutcome::ok()
    }
}

/// Shared handle to a task node.
pub type TaskRef = Arc<TaskNode>;

/// An atomic schedulable unit of work.
///
/// Identity is the [`TaskId`]; two nodes with the same name are still
/// distinct tasks. The body can be replaced after construction, which is
/// how unit-level version-check wrapping is installed.
pub struct TaskNode {
    id: TaskId,
    name: String,
    body: RwLock<Arc<dyn TaskBody>>,
    predecessors: RwLock<HashSet<TaskId>>,
    successors: RwLock<HashSet<TaskId>>,
    start_date: RwLock<Option<DateTime<Utc>>>,
}

impl TaskNode {
    /// Creates a new task node and returns a shared handle to it.
    pub fn new(name: impl Into<String>, body: impl TaskBody + 'static) -> TaskRef {
        Arc::new(Self {
            id: TaskId::new(),
            name: name.into(),
            body: RwLock::new(Arc::new(body)),
            predecessors: RwLock::new(HashSet::new()),
            successors: RwLock::new(HashSet::new()),
            start_date: RwLock::new(None),
        })
    }

    /// Returns the task identity.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle to the current body.
    #[must_use]
    pub fn body(&self) -> Arc<dyn TaskBody> {
        Arc::clone(&self.body.read())
    }

    /// Replaces the body, returning the previous one.
    pub fn set_body(&self, body: Arc<dyn TaskBody>) -> Arc<dyn TaskBody> {
        std::mem::replace(&mut *self.body.write(), body)
    }

    /// Adds an edge so that `self` precedes `downstream`.
    ///
    /// Re-adding an existing edge is a no-op; the edge sets are sets,
    /// not multisets.
    pub fn set_downstream(&self, downstream: &TaskNode) {
        self.successors.write().insert(downstream.id);
        downstream.predecessors.write().insert(self.id);
    }

    /// Returns a snapshot of the predecessor ids.
    #[must_use]
    pub fn predecessors(&self) -> HashSet<TaskId> {
        self.predecessors.read().clone()
    }

    /// Returns a snapshot of the successor ids.
    #[must_use]
    pub fn successors(&self) -> HashSet<TaskId> {
        self.successors.read().clone()
    }

    /// Returns the scheduled start date, if set.
    #[must_use]
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        *self.start_date.read()
    }

    /// Sets the scheduled start date.
    pub fn set_start_date(&self, date: DateTime<Utc>) {
        *self.start_date.write() = Some(date);
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("predecessors", &*self.predecessors.read())
            .field("successors", &*self.successors.read())
            .finish()
    }
}

impl PartialEq for TaskNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TaskNode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_distinguishes_same_name() {
        let a = TaskNode::new("load", NoOpTask);
        let b = TaskNode::new("load", NoOpTask);
        assert_ne!(a.id(), b.id());
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_set_downstream_wires_both_sides() {
        let a = TaskNode::new("a", NoOpTask);
        let b = TaskNode::new("b", NoOpTask);

        a.set_downstream(&b);

        assert!(a.successors().contains(&b.id()));
        assert!(b.predecessors().contains(&a.id()));
        assert!(a.predecessors().is_empty());
        assert!(b.successors().is_empty());
    }

    #[test]
    fn test_set_downstream_is_idempotent() {
        let a = TaskNode::new("a", NoOpTask);
        let b = TaskNode::new("b", NoOpTask);

        a.set_downstream(&b);
        a.set_downstream(&b);

        assert_eq!(a.successors().len(), 1);
        assert_eq!(b.predecessors().len(), 1);
    }

    #[tokio::test]
    async fn test_set_body_replaces_execution() {
        let task = TaskNode::new("a", NoOpTask);
        task.set_body(Arc::new(FnTask::new(|| TaskOutcome::skip("swapped"))));

        let outcome = task.body().run().await;
        assert!(outcome.is_skip());
    }

    #[test]
    fn test_start_date_default_unset() {
        let task = TaskNode::new("a", NoOpTask);
        assert!(task.start_date().is_none());

        let date = Utc::now();
        task.set_start_date(date);
        assert_eq!(task.start_date(), Some(date));
    }
}

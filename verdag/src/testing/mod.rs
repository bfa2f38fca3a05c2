//! Test fixtures.

use crate::core::{TaskBody, TaskOutcome};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A body that counts how many times it has run.
///
/// Clones share the counter, so the probe stays observable after the
/// body has been handed to a task and wrapped.
#[derive(Debug, Clone, Default)]
pub struct CountingTask {
    runs: Arc<AtomicUsize>,
}

impl CountingTask {
    /// Creates a fresh probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times the body has run.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskBody for CountingTask {
    async fn run(&self) -> TaskOutcome {
        self.runs.fetch_add(1, Ordering::SeqCst);
        TaskOutcome::ok()
    }
}

/// A body that always fails with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingTask {
    message: String,
}

impl FailingTask {
    /// Creates a failing body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl TaskBody for FailingTask {
    async fn run(&self) -> TaskOutcome {
        TaskOutcome::fail(self.message.clone())
    }
}

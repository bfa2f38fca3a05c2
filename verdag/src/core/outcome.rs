//! Task outcome type with factory methods.

use serde::{Deserialize, Serialize};

/// The status of a finished task execution.
///
/// `Skip` is a first-class outcome, distinct from both success and
/// failure: it means the task's unit version was already recorded as
/// complete and the body was intentionally not executed. Orchestrators
/// must not retry or alert on skips, and must still unblock successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The task body ran to completion.
    Ok,
    /// The task body was deliberately not run.
    Skip,
    /// The task body failed.
    Fail,
}

/// The outcome of a task execution.
///
/// `TaskOutcome` is immutable once created and provides factory methods
/// for each status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// The status of the execution.
    pub status: TaskStatus,

    /// Error message (for failed executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Skip reason (for skipped executions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl Default for TaskOutcome {
    fn default() -> Self {
        Self::ok()
    }
}

impl TaskOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: TaskStatus::Ok,
            error: None,
            skip_reason: None,
        }
    }

    /// Creates a skip outcome with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Skip,
            error: None,
            skip_reason: Some(reason.into()),
        }
    }

    /// Creates a failure outcome with an error message.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Fail,
            error: Some(error.into()),
            skip_reason: None,
        }
    }

    /// Returns true if the outcome is a success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == TaskStatus::Ok
    }

    /// Returns true if the outcome is a skip.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.status == TaskStatus::Skip
    }

    /// Returns true if the outcome is a failure.
    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.status == TaskStatus::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_statuses() {
        assert_eq!(TaskOutcome::ok().status, TaskStatus::Ok);
        assert_eq!(TaskOutcome::skip("done before").status, TaskStatus::Skip);
        assert_eq!(TaskOutcome::fail("boom").status, TaskStatus::Fail);
    }

    #[test]
    fn test_skip_carries_reason_not_error() {
        let outcome = TaskOutcome::skip("already executed");
        assert!(outcome.is_skip());
        assert_eq!(outcome.skip_reason.as_deref(), Some("already executed"));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_fail_carries_error() {
        let outcome = TaskOutcome::fail("boom");
        assert!(outcome.is_fail());
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_wire_format() {
        // Orchestrator adapters match on these strings.
        assert_eq!(
            serde_json::to_value(TaskStatus::Skip).unwrap(),
            serde_json::json!("skip")
        );
        let outcome: TaskOutcome =
            serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(outcome.is_ok());
    }
}

//! Error types for graph construction and assembly.
//!
//! Execution-time outcomes (success, skip, failure) are not errors; see
//! [`TaskOutcome`](crate::core::TaskOutcome). Errors here surface at
//! pipeline-definition time, before any task runs, and are never
//! retried: they indicate a malformed pipeline definition.

use crate::registry::RegistryError;
use thiserror::Error;

/// The main error type for verdag operations.
#[derive(Debug, Error)]
pub enum VerdagError {
    /// The task expression cannot form a usable graph.
    #[error("invalid task graph expression: {0}")]
    InvalidGraphExpression(String),

    /// More than one terminal task remained after join synthesis.
    ///
    /// This is an internal invariant violation, not a recoverable
    /// condition.
    #[error("unit '{name}' has {count} terminal tasks; expected exactly one")]
    AmbiguousTerminal {
        /// The unit name.
        name: String,
        /// How many terminal tasks were found.
        count: usize,
    },

    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

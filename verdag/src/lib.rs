//! # Verdag
//!
//! Versioned task-graph composition for orchestrated data pipelines.
//!
//! Verdag lets pipeline authors declare units of work as individual
//! tasks or as nested parallel/sequential groups, flattens those
//! declarations into a directed acyclic graph of atomic tasks, and
//! wraps every task so that a named, versioned unit of work is skipped
//! when its version has already completed, and otherwise executes and
//! atomically records completion in a durable registry.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use verdag::prelude::*;
//!
//! let registry: Arc<dyn Registry> = Arc::new(SqliteRegistry::new("pipeline.db").await?);
//!
//! let extract = TaskNode::new("extract", FnTask::new(|| TaskOutcome::ok()));
//! let clean = TaskNode::new("clean", FnTask::new(|| TaskOutcome::ok()));
//! let load = TaskNode::new("load", FnTask::new(|| TaskOutcome::ok()));
//!
//! // extract, then clean and load in parallel
//! let unit = Unit::new(
//!     "census",
//!     "2024-01",
//!     &[],
//!     TaskGraph::sequential([
//!         TaskGraph::leaf(extract),
//!         TaskGraph::parallel([clean, load]),
//!     ]),
//!     registry,
//! )?;
//!
//! let mut dag = Dag::new("etl");
//! unit.insert_into(&mut dag);
//! let report = LocalExecutor::new().run(&dag).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod core;
pub mod errors;
pub mod executor;
pub mod graph;
pub mod pipeline;
pub mod registry;
pub mod testing;
pub mod unit;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        FnTask, NoOpTask, TaskBody, TaskId, TaskNode, TaskOutcome, TaskRef, TaskStatus,
    };
    pub use crate::errors::VerdagError;
    pub use crate::executor::{ExecutionReport, LocalExecutor};
    pub use crate::graph::{connect, TaskGraph, TaskSet, Tasks};
    pub use crate::pipeline::{Dag, DagDefaults};
    pub use crate::registry::{
        InMemoryRegistry, Registry, RegistryError, RegistryTransaction, UnitRecord,
    };
    #[cfg(feature = "sqlite")]
    pub use crate::registry::SqliteRegistry;
    pub use crate::unit::Unit;
}

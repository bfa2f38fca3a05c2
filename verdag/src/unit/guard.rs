//! The version-check body wrapper.

use crate::core::{TaskBody, TaskOutcome};
use crate::registry::Registry;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Shared context for all guards of one unit.
pub(crate) struct GuardContext {
    pub(crate) name: String,
    pub(crate) version: String,
    /// Dependency `(name, version)` pairs, used to link the completion
    /// record to its dependencies' records.
    pub(crate) dependencies: Vec<(String, String)>,
    pub(crate) registry: Arc<dyn Registry>,
}

impl fmt::Debug for GuardContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardContext")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Wraps a task body with skip/record behavior.
///
/// Before running the inner body the guard checks the registry: if the
/// unit's version is already recorded the body is not run and the task
/// skips; otherwise all stale records for the name are deleted first.
/// The guard on the unit's terminal task additionally records the new
/// completion after the body succeeds.
///
/// On the terminal task the whole sequence, version lookup, stale
/// deletion, body, and completion insert, runs inside one registry
/// transaction. A concurrent run of the same unit blocks on the
/// transaction and then observes the recorded version, so two racers
/// can never both decide "not yet done" and both run the body. The
/// stale deletion commits even when the body fails: a failed re-run
/// deliberately leaves the name with no current record, so the next
/// run starts from scratch. Non-terminal tasks record nothing and
/// release the transaction before doing their work.
#[derive(Debug)]
pub(crate) struct VersionGuard {
    inner: Arc<dyn TaskBody>,
    ctx: Arc<GuardContext>,
    records_completion: bool,
}

impl VersionGuard {
    pub(crate) fn new(
        inner: Arc<dyn TaskBody>,
        ctx: Arc<GuardContext>,
        records_completion: bool,
    ) -> Self {
        Self {
            inner,
            ctx,
            records_completion,
        }
    }
}

#[async_trait]
impl TaskBody for VersionGuard {
    async fn run(&self) -> TaskOutcome {
        let ctx = &self.ctx;

        let mut tx = match ctx.registry.transaction().await {
            Ok(tx) => tx,
            Err(e) => return TaskOutcome::fail(e.to_string()),
        };
        let existing = match tx.find(&ctx.name).await {
            Ok(records) => records,
            Err(e) => return TaskOutcome::fail(e.to_string()),
        };

        if existing.iter().any(|record| record.version == ctx.version) {
            tracing::info!(
                unit = ctx.name.as_str(),
                version = ctx.version.as_str(),
                "version already executed; skipping"
            );
            return TaskOutcome::skip(format!(
                "{} version {} already executed",
                ctx.name, ctx.version
            ));
        }

        if !existing.is_empty() {
            tracing::info!(
                unit = ctx.name.as_str(),
                stale = existing.len(),
                "deleting stale completion records"
            );
        }
        if let Err(e) = tx.delete(&existing).await {
            return TaskOutcome::fail(e.to_string());
        }

        if !self.records_completion {
            if let Err(e) = tx.commit().await {
                return TaskOutcome::fail(e.to_string());
            }
            // Genuine body failures pass through unchanged.
            return self.inner.run().await;
        }

        // Terminal task: the body runs inside the transaction. The
        // body must not touch the registry itself or it would block on
        // its own transaction.
        let outcome = self.inner.run().await;

        if outcome.is_ok() {
            let record = match tx.insert(&ctx.name, &ctx.version, &ctx.dependencies).await {
                Ok(record) => record,
                Err(e) => return TaskOutcome::fail(e.to_string()),
            };
            if let Err(e) = tx.commit().await {
                return TaskOutcome::fail(e.to_string());
            }
            tracing::info!(
                unit = ctx.name.as_str(),
                version = ctx.version.as_str(),
                record_id = record.id,
                "recorded unit completion"
            );
        } else if let Err(e) = tx.commit().await {
            // Still commits the stale deletion, so the failed re-run
            // leaves no current record behind.
            return TaskOutcome::fail(e.to_string());
        }

        outcome
    }
}

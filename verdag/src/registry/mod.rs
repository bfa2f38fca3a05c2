//! The durable dependency registry.
//!
//! The registry is the source of truth for "has this named unit, at this
//! version, already completed." It stores one record per completed
//! `(name, version)` pair plus a many-to-many depends-on relation
//! between records. Backends are pluggable: an in-memory store for
//! tests and embedding, and a sqlite store for durability across
//! process restarts.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryRegistry;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A record with the same name and version already exists.
    ///
    /// Indicates a race or a logic error in the stale-record deletion
    /// step; surfaced as a task failure rather than silently swallowed.
    #[error("unit record already exists: {name} version {version}")]
    DuplicateNameVersion {
        /// The unit name.
        name: String,
        /// The version that was being inserted.
        version: String,
    },

    /// Generic backend error.
    #[error("registry backend error: {0}")]
    Backend(String),
}

/// A persisted record of a completed unit version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Opaque record identifier.
    pub id: i64,
    /// Unit name; not unique across versions.
    pub name: String,
    /// The version this record attests as completed.
    pub version: String,
    /// Record ids of the dependencies this record was linked to.
    pub dependencies: Vec<i64>,
}

/// A transaction-scoped view of the registry.
///
/// Mutations are visible to later operations on the same transaction
/// and become durable only on [`commit`](RegistryTransaction::commit);
/// dropping the transaction without committing rolls everything back.
#[async_trait]
pub trait RegistryTransaction: Send {
    /// Returns all records stored for a name, any version.
    async fn find(&mut self, name: &str) -> Result<Vec<UnitRecord>, RegistryError>;

    /// Creates a new record and its dependency links.
    ///
    /// Dependencies are matched by `(name, version)`; pairs with no
    /// stored record are skipped. Fails with
    /// [`RegistryError::DuplicateNameVersion`] if a record for the same
    /// `(name, version)` already exists.
    async fn insert(
        &mut self,
        name: &str,
        version: &str,
        dependencies: &[(String, String)],
    ) -> Result<UnitRecord, RegistryError>;

    /// Removes the given records and any dependency links referencing
    /// them. Records that no longer exist are ignored.
    async fn delete(&mut self, records: &[UnitRecord]) -> Result<(), RegistryError>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> Result<(), RegistryError>;
}

/// The registry storage interface.
///
/// [`transaction`](Registry::transaction) opens a transaction-scoped
/// unit of work; the skip-or-proceed decision of the version guard runs
/// inside one so that two concurrent runs of the same unit can never
/// both decide "not yet done". The free-standing operations are
/// single-operation conveniences that commit immediately.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Opens a new transaction.
    async fn transaction(&self) -> Result<Box<dyn RegistryTransaction>, RegistryError>;

    /// Returns all records stored for a name, any version.
    async fn find(&self, name: &str) -> Result<Vec<UnitRecord>, RegistryError> {
        let mut tx = self.transaction().await?;
        let records = tx.find(name).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// Creates a new record and its dependency links; see
    /// [`RegistryTransaction::insert`].
    async fn insert(
        &self,
        name: &str,
        version: &str,
        dependencies: &[(String, String)],
    ) -> Result<UnitRecord, RegistryError> {
        let mut tx = self.transaction().await?;
        let record = tx.insert(name, version, dependencies).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Removes the given records; see [`RegistryTransaction::delete`].
    async fn delete(&self, records: &[UnitRecord]) -> Result<(), RegistryError> {
        let mut tx = self.transaction().await?;
        tx.delete(records).await?;
        tx.commit().await?;
        Ok(())
    }
}

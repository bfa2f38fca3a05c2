//! In-memory registry backend.
//!
//! Backs the registry with a plain map behind an async mutex. The
//! mutex is held for the lifetime of a transaction, so transactions are
//! fully serialized; mutations are staged on a working copy and only
//! written back on commit.

use super::{Registry, RegistryError, RegistryTransaction, UnitRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct State {
    next_id: i64,
    records: BTreeMap<i64, UnitRecord>,
}

impl State {
    fn find(&self, name: &str) -> Vec<UnitRecord> {
        self.records
            .values()
            .filter(|record| record.name == name)
            .cloned()
            .collect()
    }

    fn insert(
        &mut self,
        name: &str,
        version: &str,
        dependencies: &[(String, String)],
    ) -> Result<UnitRecord, RegistryError> {
        let exists = self
            .records
            .values()
            .any(|record| record.name == name && record.version == version);
        if exists {
            return Err(RegistryError::DuplicateNameVersion {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        let dependency_ids: Vec<i64> = dependencies
            .iter()
            .filter_map(|(dep_name, dep_version)| {
                self.records
                    .values()
                    .find(|r| &r.name == dep_name && &r.version == dep_version)
                    .map(|r| r.id)
            })
            .collect();

        self.next_id += 1;
        let record = UnitRecord {
            id: self.next_id,
            name: name.to_string(),
            version: version.to_string(),
            dependencies: dependency_ids,
        };
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn delete(&mut self, records: &[UnitRecord]) {
        for record in records {
            if self.records.remove(&record.id).is_none() {
                continue;
            }
            // Cascade: drop links where the removed record was the
            // dependency side.
            for remaining in self.records.values_mut() {
                remaining.dependencies.retain(|id| *id != record.id);
            }
        }
    }
}

/// A registry held entirely in memory.
///
/// Cloning shares the underlying store. Not durable; intended for tests
/// and single-process embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<State>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl RegistryTransaction for InMemoryTransaction {
    async fn find(&mut self, name: &str) -> Result<Vec<UnitRecord>, RegistryError> {
        Ok(self.working.find(name))
    }

    async fn insert(
        &mut self,
        name: &str,
        version: &str,
        dependencies: &[(String, String)],
    ) -> Result<UnitRecord, RegistryError> {
        self.working.insert(name, version, dependencies)
    }

    async fn delete(&mut self, records: &[UnitRecord]) -> Result<(), RegistryError> {
        self.working.delete(records);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RegistryError> {
        *self.guard = self.working;
        Ok(())
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn transaction(&self) -> Result<Box<dyn RegistryTransaction>, RegistryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_insert_and_find() {
        let registry = InMemoryRegistry::new();

        let record = registry.insert("osm", "2024-01", &[]).await.unwrap();
        assert_eq!(record.name, "osm");
        assert_eq!(record.version, "2024-01");

        let found = registry.find("osm").await.unwrap();
        assert_eq!(found, vec![record]);
        assert!(registry.find("census").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_version_rejected() {
        let registry = InMemoryRegistry::new();
        registry.insert("osm", "1", &[]).await.unwrap();

        let err = registry.insert("osm", "1", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateNameVersion { .. }
        ));

        // A different version of the same name is fine.
        registry.insert("osm", "2", &[]).await.unwrap();
        assert_eq!(registry.find("osm").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dependency_links_resolved_by_name_version() {
        let registry = InMemoryRegistry::new();
        let base = registry.insert("base", "1", &[]).await.unwrap();
        registry.insert("base", "2", &[]).await.unwrap();

        let record = registry
            .insert(
                "derived",
                "1",
                &[
                    ("base".to_string(), "1".to_string()),
                    ("missing".to_string(), "9".to_string()),
                ],
            )
            .await
            .unwrap();

        // Linked to base@1 only; the missing pair is skipped.
        assert_eq!(record.dependencies, vec![base.id]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_cascades() {
        let registry = InMemoryRegistry::new();
        let base = registry.insert("base", "1", &[]).await.unwrap();
        registry
            .insert("derived", "1", &[("base".to_string(), "1".to_string())])
            .await
            .unwrap();

        registry.delete(std::slice::from_ref(&base)).await.unwrap();
        // Deleting again is a no-op.
        registry.delete(std::slice::from_ref(&base)).await.unwrap();

        assert!(registry.find("base").await.unwrap().is_empty());
        let derived = registry.find("derived").await.unwrap();
        assert_eq!(derived.len(), 1);
        assert!(derived[0].dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_rolls_back() {
        let registry = InMemoryRegistry::new();

        {
            let mut tx = registry.transaction().await.unwrap();
            tx.insert("osm", "1", &[]).await.unwrap();
            // Dropped without commit.
        }

        assert!(registry.find("osm").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transaction_sees_own_writes() {
        let registry = InMemoryRegistry::new();

        let mut tx = registry.transaction().await.unwrap();
        tx.insert("osm", "1", &[]).await.unwrap();
        assert_eq!(tx.find("osm").await.unwrap().len(), 1);
        tx.commit().await.unwrap();

        assert_eq!(registry.find("osm").await.unwrap().len(), 1);
    }
}

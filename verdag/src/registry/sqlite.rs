//! SQLite registry backend.
//!
//! Durable storage for unit completion records. Once an insert has
//! committed, the record survives process restart; it is the only
//! durable evidence that a unit's tasks have run for a given version.

use super::{Registry, RegistryError, RegistryTransaction, UnitRecord};
use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;
use std::path::Path;
use std::str::FromStr;

/// SQLite-backed registry.
///
/// Creates the database file if missing and applies the schema on
/// construction. Writes are serialized by sqlite's writer lock; the
/// `UNIQUE (name, version)` constraint turns racing duplicate inserts
/// into [`RegistryError::DuplicateNameVersion`].
pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    /// Opens (or creates) a registry at the given database path.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path_str = path.as_ref().to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{path_str}"))
            .map_err(|e| RegistryError::Backend(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        // One connection serializes transactions, so concurrent guards
        // never race each other into SQLITE_BUSY on lock upgrades.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| RegistryError::Backend(e.to_string()))?;

        let registry = Self { pool };
        registry.run_migrations().await?;
        Ok(registry)
    }

    /// Creates an in-memory database (useful for testing).
    pub async fn in_memory() -> Result<Self, RegistryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| RegistryError::Backend(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| RegistryError::Backend(e.to_string()))?;

        let registry = Self { pool };
        registry.run_migrations().await?;
        Ok(registry)
    }

    async fn run_migrations(&self) -> Result<(), RegistryError> {
        let schema = include_str!("../../migrations/001_initial_schema.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Backend(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

struct SqliteRegistryTransaction {
    tx: Transaction<'static, Sqlite>,
}

async fn dependency_ids(
    tx: &mut Transaction<'static, Sqlite>,
    record_id: i64,
) -> Result<Vec<i64>, RegistryError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT dependency_id FROM unit_dependencies WHERE dependent_id = ? ORDER BY dependency_id",
    )
    .bind(record_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| RegistryError::Backend(e.to_string()))?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[async_trait]
impl RegistryTransaction for SqliteRegistryTransaction {
    async fn find(&mut self, name: &str) -> Result<Vec<UnitRecord>, RegistryError> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, version FROM units WHERE name = ? ORDER BY id")
                .bind(name)
                .fetch_all(&mut *self.tx)
                .await
                .map_err(|e| RegistryError::Backend(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, name, version) in rows {
            let dependencies = dependency_ids(&mut self.tx, id).await?;
            records.push(UnitRecord {
                id,
                name,
                version,
                dependencies,
            });
        }
        Ok(records)
    }

    async fn insert(
        &mut self,
        name: &str,
        version: &str,
        dependencies: &[(String, String)],
    ) -> Result<UnitRecord, RegistryError> {
        let result = sqlx::query("INSERT INTO units (name, version) VALUES (?, ?)")
            .bind(name)
            .bind(version)
            .execute(&mut *self.tx)
            .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(RegistryError::DuplicateNameVersion {
                    name: name.to_string(),
                    version: version.to_string(),
                });
            }
            Err(e) => return Err(RegistryError::Backend(e.to_string())),
        };

        let mut linked = Vec::new();
        for (dep_name, dep_version) in dependencies {
            let row: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM units WHERE name = ? AND version = ?")
                    .bind(dep_name)
                    .bind(dep_version)
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err(|e| RegistryError::Backend(e.to_string()))?;

            let Some((dep_id,)) = row else {
                tracing::warn!(
                    unit = name,
                    dependency = dep_name.as_str(),
                    dependency_version = dep_version.as_str(),
                    "dependency has no registry record; link skipped"
                );
                continue;
            };

            sqlx::query(
                "INSERT OR IGNORE INTO unit_dependencies (dependent_id, dependency_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(dep_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| RegistryError::Backend(e.to_string()))?;
            linked.push(dep_id);
        }

        Ok(UnitRecord {
            id,
            name: name.to_string(),
            version: version.to_string(),
            dependencies: linked,
        })
    }

    async fn delete(&mut self, records: &[UnitRecord]) -> Result<(), RegistryError> {
        for record in records {
            // Absent rows are ignored; delete is idempotent. The links
            // cascade via the foreign keys.
            sqlx::query("DELETE FROM units WHERE id = ?")
                .bind(record.id)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| RegistryError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RegistryError> {
        self.tx
            .commit()
            .await
            .map_err(|e| RegistryError::Backend(e.to_string()))
    }
}

#[async_trait]
impl Registry for SqliteRegistry {
    async fn transaction(&self) -> Result<Box<dyn RegistryTransaction>, RegistryError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RegistryError::Backend(e.to_string()))?;
        Ok(Box::new(SqliteRegistryTransaction { tx }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_insert_find_delete_roundtrip() {
        let registry = SqliteRegistry::in_memory().await.unwrap();

        let record = registry.insert("osm", "2024-01", &[]).await.unwrap();
        let found = registry.find("osm").await.unwrap();
        assert_eq!(found, vec![record.clone()]);

        registry.delete(&found).await.unwrap();
        assert!(registry.find("osm").await.unwrap().is_empty());
        // Idempotent delete.
        registry.delete(std::slice::from_ref(&record)).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_name_version_rejected() {
        let registry = SqliteRegistry::in_memory().await.unwrap();
        registry.insert("osm", "1", &[]).await.unwrap();

        let err = registry.insert("osm", "1", &[]).await.unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateNameVersion { .. }));
    }

    #[tokio::test]
    async fn test_dependency_links_and_cascade() {
        let registry = SqliteRegistry::in_memory().await.unwrap();
        let base = registry.insert("base", "1", &[]).await.unwrap();
        let derived = registry
            .insert("derived", "1", &[("base".to_string(), "1".to_string())])
            .await
            .unwrap();
        assert_eq!(derived.dependencies, vec![base.id]);

        registry.delete(std::slice::from_ref(&base)).await.unwrap();

        let derived = registry.find("derived").await.unwrap();
        assert_eq!(derived.len(), 1);
        assert!(derived[0].dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_missing_dependency_pair_is_skipped() {
        let registry = SqliteRegistry::in_memory().await.unwrap();
        let record = registry
            .insert("derived", "1", &[("ghost".to_string(), "1".to_string())])
            .await
            .unwrap();
        assert!(record.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_rollback_on_drop() {
        let registry = SqliteRegistry::in_memory().await.unwrap();

        {
            let mut tx = registry.transaction().await.unwrap();
            tx.insert("osm", "1", &[]).await.unwrap();
        }

        assert!(registry.find("osm").await.unwrap().is_empty());
    }
}

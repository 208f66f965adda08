use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use ln_core::{Error, KeyValueStore, Result, Versioned};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;

use crate::{BackendConfig, StorageBackend};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        version INTEGER NOT NULL,
        value TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Storage(format!("{}: {}", context, e))
}

pub struct SQLiteStorage {
    pool: SqlitePool,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("Failed to create database directory: {}", e))
                })?;
            }
        }
        Self::connect(&format!("sqlite:{}", db_path.display())).await
    }

    async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| db_error("Invalid database URL", e))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self { pool })
    }

    async fn version_of(&self, key: &str) -> Result<u64> {
        let row = sqlx::query("SELECT version FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read version", e))?;
        Ok(row.map(|r| r.get::<i64, _>("version") as u64).unwrap_or(0))
    }
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at ./localnews.db"
    }

    async fn open(config: &BackendConfig) -> Result<Self> {
        match config.url.strip_prefix("sqlite://") {
            Some(path) => Self::new_with_path(Path::new(path)).await,
            None => Self::connect(&config.url).await,
        }
    }
}

#[async_trait]
impl KeyValueStore for SQLiteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        let row = sqlx::query("SELECT version, value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read key", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let version = row.get::<i64, _>("version") as u64;
        let raw: String = row.get("value");
        // Unparseable rows come back as a raw string so callers still see the version.
        let value = serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Row '{}' does not hold valid JSON: {}", key, e);
            Value::String(raw.clone())
        });
        Ok(Some(Versioned { version, value }))
    }

    async fn put(&self, key: &str, value: Value) -> Result<u64> {
        let row = sqlx::query(
            r#"
            INSERT INTO kv (key, version, value) VALUES (?, 1, ?)
            ON CONFLICT(key) DO UPDATE SET version = version + 1, value = excluded.value
            RETURNING version
            "#,
        )
        .bind(key)
        .bind(value.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to write key", e))?;
        Ok(row.get::<i64, _>("version") as u64)
    }

    async fn compare_and_swap(&self, key: &str, expected: u64, value: Value) -> Result<u64> {
        let query = if expected == 0 {
            sqlx::query("INSERT OR IGNORE INTO kv (key, version, value) VALUES (?, 1, ?)")
                .bind(key)
                .bind(value.to_string())
                .execute(&self.pool)
                .await
        } else {
            sqlx::query("UPDATE kv SET version = version + 1, value = ? WHERE key = ? AND version = ?")
                .bind(value.to_string())
                .bind(key)
                .bind(expected as i64)
                .execute(&self.pool)
                .await
        };
        let result = query.map_err(|e| db_error("Failed to write key", e))?;

        if result.rows_affected() == 1 {
            return Ok(expected + 1);
        }
        Err(Error::Conflict {
            key: key.to_string(),
            expected,
            found: self.version_of(key).await?,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete key", e))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM kv")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list keys", e))?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("key")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::exercise_store;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();
        exercise_store(&storage).await;
    }
}

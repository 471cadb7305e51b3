//! SQLite-backed substrate.
//!
//! Documents are stored as JSON text keyed by their document key; index
//! definitions are stored alongside them. Searches load the documents under
//! the index prefix and evaluate the filter in process.

use super::{
    AggregateRow, Aggregation, IndexDefinition, SearchQuery, SearchResult, SetMode, Substrate, eval,
};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    doc_key TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS search_indexes (
    name TEXT PRIMARY KEY NOT NULL,
    definition TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

/// SQLite substrate.
pub struct SqliteSubstrate {
    pool: Pool<Sqlite>,
    query_timeout: Duration,
}

impl SqliteSubstrate {
    /// Open (creating if missing) the database at `path`.
    pub async fn new(path: impl AsRef<Path>, query_timeout_secs: Option<u64>) -> StoreResult<Self> {
        let path = path.as_ref();
        let query_timeout = Duration::from_secs(query_timeout_secs.unwrap_or(30));

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        // Single connection: every statement is serialized, so a conditional
        // insert or a delete observes all writes before it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let substrate = Self {
            pool,
            query_timeout,
        };
        substrate.migrate().await?;

        tracing::debug!(
            path = %path.display(),
            query_timeout_secs = query_timeout.as_secs(),
            "Opened SQLite substrate"
        );

        Ok(substrate)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create tables if they do not exist.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    // SQLite cannot cancel a running statement; slow operations are reported instead.
    fn warn_if_slow(&self, operation: &str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed > self.query_timeout {
            tracing::warn!(
                operation = operation,
                elapsed_ms = elapsed.as_millis() as u64,
                query_timeout_secs = self.query_timeout.as_secs(),
                "SQLite operation exceeded query timeout"
            );
        }
    }

    async fn definition(&self, name: &str) -> StoreResult<IndexDefinition> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT definition FROM search_indexes WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((definition,)) => Ok(serde_json::from_str(&definition)?),
            None => Err(StoreError::UnknownIndex(name.to_string())),
        }
    }

    async fn documents_under(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT doc_key, body FROM documents WHERE substr(doc_key, 1, ?) = ? ORDER BY doc_key",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key, body)| {
                let value = serde_json::from_str(&body)?;
                Ok((key, value))
            })
            .collect()
    }
}

#[async_trait]
impl Substrate for SqliteSubstrate {
    async fn create_index(&self, name: &str, definition: &IndexDefinition) -> StoreResult<()> {
        let body = serde_json::to_string(definition)?;
        let result = sqlx::query(
            "INSERT INTO search_indexes (name, definition, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(body)
        .bind(depot_core::dates::now_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::IndexExists(name.to_string()));
        }
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM search_indexes WHERE name = ?)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn drop_index(&self, name: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM search_indexes WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownIndex(name.to_string()));
        }
        Ok(())
    }

    async fn list_indexes(&self) -> StoreResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM search_indexes ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn json_set(&self, key: &str, value: &Value, mode: SetMode) -> StoreResult<bool> {
        if !value.is_object() {
            return Err(StoreError::Substrate {
                key: key.to_string(),
                message: "document root must be an object".to_string(),
            });
        }
        let body = serde_json::to_string(value)?;
        let sql = match mode {
            SetMode::Always => {
                "INSERT INTO documents (doc_key, body) VALUES (?, ?) \
                 ON CONFLICT(doc_key) DO UPDATE SET body = excluded.body"
            }
            SetMode::IfAbsent => {
                "INSERT INTO documents (doc_key, body) VALUES (?, ?) \
                 ON CONFLICT(doc_key) DO NOTHING"
            }
        };

        let started = Instant::now();
        let result = sqlx::query(sql)
            .bind(key)
            .bind(body)
            .execute(&self.pool)
            .await?;
        self.warn_if_slow("json_set", started);

        Ok(result.rows_affected() == 1)
    }

    async fn json_get(&self, key: &str) -> StoreResult<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM documents WHERE doc_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(body,)| serde_json::from_str(&body))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn unlink(&self, key: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE doc_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> StoreResult<SearchResult> {
        let started = Instant::now();
        let definition = self.definition(index).await?;
        let documents = self.documents_under(&definition.prefix).await?;
        let result = eval::search(
            &definition,
            documents.iter().map(|(key, value)| (key, value)),
            query,
        );
        self.warn_if_slow("search", started);
        result
    }

    async fn aggregate(
        &self,
        index: &str,
        aggregation: &Aggregation,
    ) -> StoreResult<Vec<AggregateRow>> {
        let started = Instant::now();
        let definition = self.definition(index).await?;
        let documents = self.documents_under(&definition.prefix).await?;
        let rows = eval::aggregate(
            &definition,
            documents.iter().map(|(key, value)| (key, value)),
            aggregation,
        );
        self.warn_if_slow("aggregate", started);
        rows
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

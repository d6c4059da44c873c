//! PostgreSQL-backed session store.
//!
//! One session maps to one row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS http_sessions (
//!     key VARCHAR(64) PRIMARY KEY,
//!     data TEXT NOT NULL,
//!     expire TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! )
//! ```
//!
//! Writes are last-write-wins single statements; no transactions. Loads do
//! not filter on `expire`, and updates rewrite `data` only, so a row keeps
//! the expiry stamped when it was inserted until [`SessionStore::delete_expired`]
//! removes it.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use stowage_session::{SessionKey, SessionRecord, SessionStore, StoreError};
use tracing::{debug, info, instrument};

use crate::config::{DEFAULT_TABLE, PostgresConfig, validate_table_name};
use crate::pool::{PgPool, create_pool};

/// Session store persisting to a PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: Arc<PgPool>,
    table: String,
}

impl PostgresSessionStore {
    /// Creates a store on an existing pool, using the default table name.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Replaces the table name.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error if the name is not a plain lowercase
    /// identifier.
    pub fn with_table(mut self, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        validate_table_name(&table)?;
        self.table = table;
        Ok(self)
    }

    /// Connects a new pool from configuration and builds the store on it.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error if the configuration is invalid, or a
    /// `Database` error if the pool cannot be established.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let pool = create_pool(config).await?;

        Ok(Self {
            pool: Arc::new(pool),
            table: config.table_name.clone(),
        })
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The table this store reads and writes.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the session table and its expiry index if they do not exist.
    ///
    /// Safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns a `Database` error if either DDL statement fails.
    #[instrument(skip(self))]
    pub async fn create_table_if_missing(&self) -> Result<(), StoreError> {
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                key VARCHAR(64) PRIMARY KEY,
                data TEXT NOT NULL,
                expire TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            self.table
        );
        query(&create)
            .execute(&*self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to create session table: {e}")))?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_expire ON {} (expire)",
            self.table, self.table
        );
        query(&index)
            .execute(&*self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to create expiry index: {e}")))?;

        info!(table = %self.table, "Session table ready");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    #[instrument(skip(self, key), fields(key = key.prefix()))]
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, StoreError> {
        let sql = format!("SELECT data FROM {} WHERE key = $1", self.table);

        query_scalar::<_, String>(&sql)
            .bind(key.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to load session: {e}")))
    }

    #[instrument(skip(self, record), fields(key = record.key.prefix(), fresh = record.fresh))]
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        if record.fresh {
            let sql = format!(
                "INSERT INTO {} (key, data, expire) VALUES ($1, $2, $3)",
                self.table
            );
            query(&sql)
                .bind(record.key.as_str())
                .bind(record.data.as_str())
                .bind(record.expires_at)
                .execute(&*self.pool)
                .await
                .map_err(|e| {
                    if let sqlx_core::Error::Database(ref db_err) = e
                        && db_err.is_unique_violation()
                    {
                        return StoreError::conflict(format!(
                            "Session '{}' already exists",
                            record.key.prefix()
                        ));
                    }
                    StoreError::database(format!("Failed to insert session: {e}"))
                })?;

            info!(key = record.key.prefix(), "Session created");
        } else {
            let sql = format!("UPDATE {} SET data = $1 WHERE key = $2", self.table);
            let result = query(&sql)
                .bind(record.data.as_str())
                .bind(record.key.as_str())
                .execute(&*self.pool)
                .await
                .map_err(|e| StoreError::database(format!("Failed to update session: {e}")))?;

            if result.rows_affected() == 0 {
                debug!(key = record.key.prefix(), "Update targeted a missing session row");
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {} WHERE expire <= NOW()", self.table);
        let result = query(&sql)
            .execute(&*self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to delete expired sessions: {e}")))?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, table = %self.table, "Expired sessions removed");
        }
        Ok(removed)
    }
}


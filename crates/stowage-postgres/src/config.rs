//! PostgreSQL backend configuration.

use serde::{Deserialize, Serialize};
use stowage_session::StoreError;

/// Default session table name.
pub const DEFAULT_TABLE: &str = "http_sessions";

/// PostgreSQL connection and pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum connection pool size
    pub pool_size: u32,

    /// Minimum idle connections to keep open (defaults to a quarter of the
    /// pool when unset)
    pub min_connections: Option<u32>,

    /// Connection acquire timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Idle connection timeout in milliseconds
    pub idle_timeout_ms: Option<u64>,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: Option<u64>,

    /// Table the sessions are stored in
    pub table_name: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/stowage".to_string(),
            pool_size: 10,
            min_connections: None,
            connect_timeout_ms: 5000,
            idle_timeout_ms: Some(300_000),
            max_lifetime_secs: None,
            table_name: DEFAULT_TABLE.to_string(),
        }
    }
}

impl PostgresConfig {
    /// Creates a configuration for the given connection URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the maximum connection pool size.
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Sets the minimum idle connection count.
    #[must_use]
    pub fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.min_connections = Some(min_connections);
        self
    }

    /// Sets the connection acquire timeout in milliseconds.
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, connect_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = connect_timeout_ms;
        self
    }

    /// Sets the session table name.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error if the URL is empty, the pool size is
    /// zero, or the table name is not a plain identifier.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.url.is_empty() {
            return Err(StoreError::invalid_input("database url cannot be empty"));
        }

        if self.pool_size == 0 {
            return Err(StoreError::invalid_input("pool_size must be > 0"));
        }

        validate_table_name(&self.table_name)
    }
}

/// Validates that a table name is safe to interpolate into SQL statements.
///
/// Table names cannot be bound as parameters, so the name is restricted to
/// `[a-z_][a-z0-9_]*` within PostgreSQL's 63-byte identifier limit.
pub(crate) fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = name
        .chars()
        .skip(1)
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !valid_start || !valid_rest || name.len() > 63 {
        return Err(StoreError::invalid_input(format!(
            "Invalid table name '{name}': expected a lowercase identifier"
        )));
    }

    Ok(())
}

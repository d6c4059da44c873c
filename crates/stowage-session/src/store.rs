//! Storage interface for persisted sessions.
//!
//! Backends map a session key to a single row of serialized data plus an
//! expiry timestamp. Implementations live in their own crates (or in
//! [`memory`](crate::memory) for tests and single-process use) and stay
//! backend-agnostic by reporting failures through [`StoreError`].

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::key::SessionKey;

// =============================================================================
// Types
// =============================================================================

/// A session as the backing store sees it.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Primary key for the session row.
    pub key: SessionKey,

    /// Opaque serialized payload. Stores never look inside it.
    pub data: String,

    /// When the session stops being valid.
    ///
    /// Recorded on insert. Updates rewrite `data` only and leave the stored
    /// expiry untouched, so this field is ignored on the update path.
    pub expires_at: OffsetDateTime,

    /// Whether the row is known not to exist yet.
    ///
    /// Fresh records are inserted; everything else is updated in place.
    pub fresh: bool,
}

impl SessionRecord {
    /// Creates a record for a session that has never been stored.
    #[must_use]
    pub fn fresh(key: SessionKey, data: String, expires_at: OffsetDateTime) -> Self {
        Self {
            key,
            data,
            expires_at,
            fresh: true,
        }
    }

    /// Creates a record for a session that already has a row.
    #[must_use]
    pub fn persisted(key: SessionKey, data: String, expires_at: OffsetDateTime) -> Self {
        Self {
            key,
            data,
            expires_at,
            fresh: false,
        }
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Storage backend for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads serialized session data by key.
    ///
    /// Returns `Ok(None)` when no row exists. Expired rows are still
    /// returned: expiry is bookkeeping, not an access filter.
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, StoreError>;

    /// Persists a record, inserting or updating depending on freshness.
    ///
    /// Updating a key that has no row is not an error; the write is simply
    /// lost, mirroring an `UPDATE` that matches nothing.
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Removes rows whose expiry has passed. Returns the number removed.
    ///
    /// Nothing calls this automatically; it exists for periodic maintenance.
    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

// =============================================================================
// Errors
// =============================================================================

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A fresh record collided with an existing row.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    /// Create a `Database` error.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a `Database` error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if this is an `InvalidInput` error.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

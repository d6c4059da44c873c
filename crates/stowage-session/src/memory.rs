//! In-memory session store.
//!
//! Backed by a `DashMap`; suitable for tests and single-process deployments.
//! Mirrors the relational semantics exactly: fresh saves conflict on an
//! existing key, updates rewrite data only, and nothing expires until
//! `delete_expired` runs.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use crate::key::SessionKey;
use crate::store::{SessionRecord, SessionStore, StoreError};

#[derive(Debug, Clone)]
struct StoredSession {
    data: String,
    expires_at: OffsetDateTime,
}

/// Session store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: DashMap<String, StoredSession>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Number of stored sessions, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, StoreError> {
        Ok(self
            .sessions
            .get(key.as_str())
            .map(|entry| entry.data.clone()))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        if record.fresh {
            match self.sessions.entry(record.key.as_str().to_string()) {
                Entry::Occupied(_) => Err(StoreError::conflict(format!(
                    "Session '{}' already exists",
                    record.key.prefix()
                ))),
                Entry::Vacant(vacant) => {
                    vacant.insert(StoredSession {
                        data: record.data.clone(),
                        expires_at: record.expires_at,
                    });
                    Ok(())
                }
            }
        } else {
            // Data-only update; the stored expiry stays as inserted. A
            // missing row means the write is lost, like an UPDATE matching
            // nothing.
            if let Some(mut entry) = self.sessions.get_mut(record.key.as_str()) {
                entry.data = record.data.clone();
            }
            Ok(())
        }
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = OffsetDateTime::now_utc();
        // Saves can land while the sweep walks the shards, so the closure
        // counts exactly what it drops; length deltas would race.
        let mut removed = 0u64;
        self.sessions.retain(|_, stored| {
            let keep = stored.expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

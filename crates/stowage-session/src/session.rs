//! The request-facing session handle.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::SessionError;
use crate::key::SessionKey;

#[derive(Debug, Default)]
struct SessionInner {
    values: HashMap<String, Value>,
    modified: bool,
}

/// Handle to the session for one request.
///
/// Cheap to clone; all clones share the same state. The middleware creates
/// one per request, hands it to the handler through request extensions, and
/// persists it afterwards if (and only if) it was modified. Untouched
/// sessions, brand-new ones included, write no row and set no cookie.
///
/// Values are JSON-backed: anything `Serialize`/`Deserialize` goes in and
/// comes out typed.
#[derive(Debug, Clone)]
pub struct Session {
    key: SessionKey,
    fresh: bool,
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// Creates an empty session with a newly generated key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: SessionKey::generate(),
            fresh: true,
            inner: Arc::new(Mutex::new(SessionInner::default())),
        }
    }

    /// Rebuilds a session from its stored serialized form.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if `data` is not a JSON
    /// object. Callers treat that as a corrupt row and start a fresh session
    /// instead of failing the request.
    pub fn decode(key: SessionKey, data: &str) -> Result<Self, serde_json::Error> {
        let values: HashMap<String, Value> = serde_json::from_str(data)?;
        Ok(Self {
            key,
            fresh: false,
            inner: Arc::new(Mutex::new(SessionInner {
                values,
                modified: false,
            })),
        })
    }

    /// Serializes the session values for storage.
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if the value map cannot be rendered
    /// as JSON.
    pub async fn encode(&self) -> Result<String, SessionError> {
        let inner = self.inner.lock().await;
        Ok(serde_json::to_string(&inner.values)?)
    }

    /// The session's key.
    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Whether this session has no row in the store yet.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.fresh
    }

    /// Whether a value was inserted, removed, or cleared this request.
    pub async fn is_modified(&self) -> bool {
        self.inner.lock().await.modified
    }

    /// Gets a value, deserialized as `T`.
    ///
    /// Returns `None` when the key is absent or the stored value does not
    /// deserialize as `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.inner.lock().await;
        let value = inner.values.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    /// Inserts a value, marking the session modified.
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if `value` cannot be converted to
    /// JSON.
    pub async fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.inner.lock().await;
        inner.values.insert(key.to_string(), value);
        inner.modified = true;
        Ok(())
    }

    /// Removes a value, returning it if it was present.
    pub async fn remove(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().await;
        let removed = inner.values.remove(key);
        if removed.is_some() {
            inner.modified = true;
        }
        removed
    }

    /// Checks whether a key is present.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.lock().await.values.contains_key(key)
    }

    /// Removes every value.
    ///
    /// Clearing an already-empty session is a no-op and does not mark it
    /// modified, so an untouched new session stays unpersisted.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.values.is_empty() {
            inner.values.clear();
            inner.modified = true;
        }
    }

    /// Number of stored values.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.values.len()
    }

    /// Whether the session holds no values.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.values.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[tokio::test]
    async fn test_new_session_is_fresh_and_unmodified() {
        let session = Session::new();
        assert!(session.is_new());
        assert!(!session.is_modified().await);
        assert!(session.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_and_get_typed() {
        let session = Session::new();
        let profile = Profile {
            name: "amira".to_string(),
            visits: 3,
        };

        session.insert("profile", &profile).await.unwrap();
        assert!(session.is_modified().await);
        assert_eq!(session.len().await, 1);

        let loaded: Profile = session.get("profile").await.unwrap();
        assert_eq!(loaded, profile);
    }

    #[tokio::test]
    async fn test_get_with_wrong_type_returns_none() {
        let session = Session::new();
        session.insert("count", 7u32).await.unwrap();

        let as_string: Option<String> = session.get("count").await;
        assert!(as_string.is_none());

        let as_number: Option<u32> = session.get("count").await;
        assert_eq!(as_number, Some(7));
    }

    #[tokio::test]
    async fn test_remove_marks_modified_only_when_present() {
        let session = Session::new();
        assert!(session.remove("missing").await.is_none());
        assert!(!session.is_modified().await);

        session.insert("flag", true).await.unwrap();
        assert!(session.remove("flag").await.is_some());
        assert!(session.is_modified().await);
    }

    #[tokio::test]
    async fn test_clear_on_empty_session_is_noop() {
        let session = Session::new();
        session.clear().await;
        assert!(!session.is_modified().await);

        session.insert("k", 1).await.unwrap();
        session.clear().await;
        assert!(session.is_empty().await);
        assert!(session.is_modified().await);
    }

    #[tokio::test]
    async fn test_encode_decode_roundtrip() {
        let session = Session::new();
        session.insert("user", "amira").await.unwrap();
        session.insert("count", 2).await.unwrap();

        let data = session.encode().await.unwrap();
        let restored = Session::decode(session.key().clone(), &data).unwrap();

        assert!(!restored.is_new());
        assert!(!restored.is_modified().await);
        assert_eq!(restored.get::<String>("user").await.unwrap(), "amira");
        assert_eq!(restored.get::<u32>("count").await.unwrap(), 2);
    }

    #[test]
    fn test_decode_rejects_non_object_data() {
        let key = SessionKey::generate();
        assert!(Session::decode(key.clone(), "not json").is_err());
        assert!(Session::decode(key.clone(), "[1, 2, 3]").is_err());
        assert!(Session::decode(key, "{}").is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = Session::new();
        let clone = session.clone();

        clone.insert("shared", 1).await.unwrap();
        assert!(session.is_modified().await);
        assert_eq!(session.get::<u32>("shared").await, Some(1));
    }
}

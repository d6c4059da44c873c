//! Session key generation and validation.
//!
//! A session key is the primary key of the persisted session row. Keys carry
//! 256 bits of CSPRNG entropy and travel only inside the sealed cookie, never
//! in the clear.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};

/// Raw entropy per key (256 bits).
pub const KEY_BYTES: usize = 32;

/// Length of the encoded form: unpadded URL-safe base64 of 32 bytes.
pub const ENCODED_KEY_LEN: usize = 43;

/// An opaque session identifier.
///
/// Stored in its encoded form so it can be bound to SQL parameters and used
/// as a map key without re-encoding. Deserialization goes through
/// [`SessionKey::parse`], so a key that exists always satisfies the length
/// and alphabet invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(BASE64URL.encode(bytes))
    }

    /// Parses an encoded key, rejecting anything that is not exactly
    /// [`KEY_BYTES`] of URL-safe base64.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSessionKey`] if the input has the wrong length or is
    /// not valid base64.
    pub fn parse(value: &str) -> Result<Self, InvalidSessionKey> {
        if value.len() != ENCODED_KEY_LEN {
            return Err(InvalidSessionKey(format!(
                "expected {} characters, got {}",
                ENCODED_KEY_LEN,
                value.len()
            )));
        }

        let decoded = BASE64URL
            .decode(value)
            .map_err(|e| InvalidSessionKey(format!("not URL-safe base64: {e}")))?;

        if decoded.len() != KEY_BYTES {
            return Err(InvalidSessionKey(format!(
                "expected {} bytes, got {}",
                KEY_BYTES,
                decoded.len()
            )));
        }

        Ok(Self(value.to_string()))
    }

    /// The encoded form, suitable for SQL binds and map keys.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix for log fields, so full keys stay out of logs.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        SessionKey::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Error returned when a string is not a valid session key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid session key: {0}")]
pub struct InvalidSessionKey(String);

//! Sealed values using AES-256-GCM.
//!
//! A sealed value is `base64url(nonce || ciphertext)` with the cookie name
//! authenticated as associated data, so a value minted for one cookie cannot
//! be replayed under another name. The same construction covers both the
//! cookie value (the sealed session key) and the stored session payload:
//! neither the key nor the session values ever travel or rest in the clear.
//! Multiple keys are supported so deployments can rotate the sealing key
//! without invalidating every live session at once.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64URL},
};
use rand::RngCore;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits)
pub const KEY_SIZE: usize = 32;

/// Errors from sealing or opening cookie values.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// Key material could not be parsed.
    #[error("Invalid codec key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("Seal failed: {0}")]
    Seal(String),

    /// The value could not be decoded or authenticated.
    ///
    /// Deliberately carries no detail about which stage failed; callers treat
    /// every rejected value the same way.
    #[error("Cookie value rejected")]
    Rejected,
}

impl CodecError {
    /// Create an `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey(message.into())
    }

    /// Create a `Seal` error.
    #[must_use]
    pub fn seal(message: impl Into<String>) -> Self {
        Self::Seal(message.into())
    }
}

/// Seals and opens session cookie values.
///
/// Holds the primary sealing key plus any number of fallback keys. Sealing
/// always uses the primary key; opening tries the primary first and then each
/// fallback in order.
#[derive(Clone)]
pub struct SessionCodec {
    /// Primary key first, fallbacks after, never empty.
    keys: Vec<[u8; KEY_SIZE]>,
}

impl SessionCodec {
    /// Creates a codec with a single sealing key.
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { keys: vec![key] }
    }

    /// Adds a fallback key tried when opening values sealed before a key
    /// rotation.
    #[must_use]
    pub fn with_fallback(mut self, key: [u8; KEY_SIZE]) -> Self {
        self.keys.push(key);
        self
    }

    /// Builds a codec from encoded key strings, primary first.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidKey` if any string is not a valid key.
    pub fn from_strings(primary: &str, fallbacks: &[String]) -> Result<Self, CodecError> {
        let mut codec = Self::new(Self::parse_key(primary)?);
        for fallback in fallbacks {
            codec = codec.with_fallback(Self::parse_key(fallback)?);
        }
        Ok(codec)
    }

    /// Parses a key from a hex or base64 string.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidKey` if the string decodes to anything
    /// other than [`KEY_SIZE`] bytes.
    pub fn parse_key(key_str: &str) -> Result<[u8; KEY_SIZE], CodecError> {
        // Try hex first
        if key_str.len() == KEY_SIZE * 2 {
            let bytes = hex::decode(key_str)
                .map_err(|e| CodecError::invalid_key(format!("Invalid hex key: {e}")))?;
            if bytes.len() == KEY_SIZE {
                let mut key = [0u8; KEY_SIZE];
                key.copy_from_slice(&bytes);
                return Ok(key);
            }
        }

        // Try base64
        let bytes = BASE64
            .decode(key_str.trim())
            .map_err(|e| CodecError::invalid_key(format!("Invalid base64 key: {e}")))?;

        if bytes.len() != KEY_SIZE {
            return Err(CodecError::invalid_key(format!(
                "Key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(key)
    }

    /// Generates a new random key.
    #[must_use]
    pub fn generate_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    /// Seals a plaintext value under the given cookie name.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Seal` if encryption fails.
    pub fn seal(&self, name: &str, plaintext: &str) -> Result<String, CodecError> {
        let cipher = Aes256Gcm::new_from_slice(&self.keys[0])
            .map_err(|e| CodecError::seal(format!("Failed to create cipher: {e}")))?;

        // Generate random nonce
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: name.as_bytes(),
                },
            )
            .map_err(|e| CodecError::seal(format!("Encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);

        Ok(BASE64URL.encode(out))
    }

    /// Opens a sealed value, trying each key in order.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Rejected` if the value does not decode, does not
    /// authenticate under any key, or was sealed under a different name.
    pub fn open(&self, name: &str, value: &str) -> Result<String, CodecError> {
        let raw = BASE64URL.decode(value).map_err(|_| CodecError::Rejected)?;

        if raw.len() <= NONCE_SIZE {
            return Err(CodecError::Rejected);
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        for key in &self.keys {
            let Ok(cipher) = Aes256Gcm::new_from_slice(key) else {
                continue;
            };

            if let Ok(plaintext) = cipher.decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: name.as_bytes(),
                },
            ) {
                return String::from_utf8(plaintext).map_err(|_| CodecError::Rejected);
            }
        }

        Err(CodecError::Rejected)
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("keys", &format!("<{} redacted>", self.keys.len()))
            .finish()
    }
}

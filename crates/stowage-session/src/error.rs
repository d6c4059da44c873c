//! Session layer error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::store::StoreError;

/// Errors that can surface from the session middleware and its collaborators.
///
/// Unreadable cookies never produce one of these: they degrade to a fresh
/// session. A `SessionError` means the infrastructure itself failed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// Sealing a cookie value failed while issuing a session.
    #[error("Codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// Session values could not be serialized.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// The session layer is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl SessionError {
    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Codec` error.
    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a storage error.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        Self::codec(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "session_error",
            "message": self.to_string(),
        });

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::storage("connection refused");
        assert_eq!(err.to_string(), "Storage error: connection refused");

        let err = SessionError::configuration("missing key");
        assert_eq!(err.to_string(), "Configuration error: missing key");
    }

    #[test]
    fn test_error_predicates() {
        assert!(SessionError::storage("x").is_storage_error());
        assert!(!SessionError::storage("x").is_configuration_error());
        assert!(SessionError::configuration("x").is_configuration_error());
    }

    #[test]
    fn test_from_store_error() {
        let err = SessionError::from(StoreError::database("timeout"));
        assert!(err.is_storage_error());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_from_codec_error() {
        let err = SessionError::from(CodecError::seal("cipher failure"));
        assert!(matches!(err, SessionError::Codec { .. }));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = SessionError::from(json_err);
        assert!(matches!(err, SessionError::Serialization { .. }));
    }

    #[test]
    fn test_into_response_is_internal_error() {
        let response = SessionError::storage("down").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

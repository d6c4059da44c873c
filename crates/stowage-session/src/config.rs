//! Session layer configuration.
//!
//! Covers the session lifetime, the sealing keys, and the attributes of the
//! cookie that carries the sealed session key.

use std::time::Duration;

use cookie::SameSite;
use serde::{Deserialize, Serialize};

/// Root session configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [session]
/// ttl = "30d"
/// key = "6d5a7e...64 hex chars...c3"
///
/// [session.cookie]
/// name = "session"
/// secure = true
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long an issued session stays valid.
    ///
    /// Recorded in the row's expiry on insert and used as the cookie
    /// `Max-Age`. The expiry is bookkeeping: loads do not filter on it.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Primary sealing key as hex or base64 (32 bytes decoded).
    ///
    /// Required to build a [`SessionState`](crate::SessionState) from
    /// configuration alone.
    pub key: Option<String>,

    /// Fallback keys tried when opening cookies sealed before a rotation.
    pub fallback_keys: Vec<String>,

    /// Attributes of the session cookie.
    pub cookie: CookieConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 24 * 3600), // 30 days
            key: None,
            fallback_keys: Vec::new(),
            cookie: CookieConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Sets the session lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the primary sealing key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the cookie attributes.
    #[must_use]
    pub fn with_cookie(mut self, cookie: CookieConfig) -> Self {
        self.cookie = cookie;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the lifetime is zero or any
    /// cookie attribute is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidValue("ttl must be > 0".to_string()));
        }

        self.cookie.validate()
    }
}

/// Attributes of the session cookie.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name. Also authenticated into the sealed value, so renaming
    /// the cookie invalidates values sealed under the old name.
    pub name: String,

    /// Cookie path.
    pub path: String,

    /// Cookie domain. `None` scopes the cookie to the origin host.
    pub domain: Option<String>,

    /// Only send the cookie over HTTPS.
    pub secure: bool,

    /// Hide the cookie from client-side scripts.
    pub http_only: bool,

    /// SameSite policy: "lax", "strict", or "none".
    pub same_site: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: "lax".to_string(),
        }
    }
}

impl CookieConfig {
    /// Sets the cookie name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the cookie path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the cookie domain.
    #[must_use]
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    /// Sets the `Secure` attribute.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// The parsed SameSite policy. Unknown strings fall back to `Lax`;
    /// `validate` rejects them up front.
    #[must_use]
    pub fn same_site(&self) -> SameSite {
        match self.same_site.to_ascii_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        }
    }

    /// Validates the cookie attributes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The name is empty or contains separators
    /// - The path does not start with `/`
    /// - The SameSite policy is unknown
    /// - `SameSite=None` is combined with `secure = false`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "cookie name cannot be empty".to_string(),
            ));
        }

        if self
            .name
            .chars()
            .any(|c| c == '=' || c == ';' || c.is_whitespace())
        {
            return Err(ConfigError::InvalidValue(format!(
                "cookie name '{}' contains separator characters",
                self.name
            )));
        }

        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "cookie path '{}' must start with '/'",
                self.path
            )));
        }

        match self.same_site.to_ascii_lowercase().as_str() {
            "lax" | "strict" => {}
            "none" => {
                // Browsers drop SameSite=None cookies without Secure.
                if !self.secure {
                    return Err(ConfigError::InvalidValue(
                        "same_site \"none\" requires secure = true".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid same_site: '{}'. Must be lax, strict, or none",
                    other
                )));
            }
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(30 * 24 * 3600));
        assert!(config.key.is_none());
        assert!(config.fallback_keys.is_empty());
        assert_eq!(config.cookie.name, "session");
        assert_eq!(config.cookie.path, "/");
        assert!(config.cookie.secure);
        assert!(config.cookie.http_only);
        assert_eq!(config.cookie.same_site(), SameSite::Lax);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_fails_validation() {
        let config = SessionConfig::default().with_ttl(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ttl"));
    }

    #[test]
    fn test_empty_cookie_name_fails_validation() {
        let config = SessionConfig::default().with_cookie(CookieConfig::default().with_name(""));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("cookie name"));
    }

    #[test]
    fn test_cookie_name_with_separator_fails_validation() {
        for name in ["a=b", "a;b", "a b"] {
            let cookie = CookieConfig::default().with_name(name);
            assert!(cookie.validate().is_err(), "name {:?} should be rejected", name);
        }
    }

    #[test]
    fn test_relative_path_fails_validation() {
        let cookie = CookieConfig::default().with_path("auth");
        let err = cookie.validate().unwrap_err();
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn test_same_site_parsing() {
        for (value, expected) in [
            ("lax", SameSite::Lax),
            ("Strict", SameSite::Strict),
            ("none", SameSite::None),
        ] {
            let mut cookie = CookieConfig::default();
            cookie.same_site = value.to_string();
            assert_eq!(cookie.same_site(), expected);
        }
    }

    #[test]
    fn test_unknown_same_site_fails_validation() {
        let mut cookie = CookieConfig::default();
        cookie.same_site = "sometimes".to_string();
        let err = cookie.validate().unwrap_err();
        assert!(err.to_string().contains("same_site"));
    }

    #[test]
    fn test_same_site_none_requires_secure() {
        let mut cookie = CookieConfig::default().with_secure(false);
        cookie.same_site = "none".to_string();
        let err = cookie.validate().unwrap_err();
        assert!(err.to_string().contains("secure"));

        let mut cookie = CookieConfig::default();
        cookie.same_site = "none".to_string();
        assert!(cookie.validate().is_ok());
    }

    #[test]
    fn test_ttl_deserializes_humantime() {
        let config: SessionConfig = serde_json::from_str(r#"{"ttl": "1h"}"#).unwrap();
        assert_eq!(config.ttl, Duration::from_secs(3600));
        // Unspecified sections fall back to defaults.
        assert_eq!(config.cookie.name, "session");
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = SessionConfig::default()
            .with_key("deadbeef")
            .with_cookie(CookieConfig::default().with_domain(Some("example.com".to_string())));

        let json = serde_json::to_string(&config).unwrap();
        let parsed: SessionConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.ttl, config.ttl);
        assert_eq!(parsed.key.as_deref(), Some("deadbeef"));
        assert_eq!(parsed.cookie.domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("session.key".to_string());
        assert_eq!(err.to_string(), "Missing required configuration: session.key");
    }
}

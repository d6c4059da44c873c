//! Session middleware for Axum.
//!
//! [`session_middleware`] wraps each request:
//!
//! 1. Read the configured cookie and unseal it into a session key.
//! 2. Load the matching row and unseal its payload. A missing cookie, an
//!    unreadable cookie, an unknown key, or an undecodable payload all
//!    degrade to a brand-new session; a database failure does not, and
//!    surfaces as a 500.
//! 3. Expose the [`Session`] to handlers through request extensions; the
//!    `Session` extractor pulls it back out.
//! 4. After the handler, seal and persist the session if it was modified and
//!    set a fresh cookie on the response. Untouched sessions write nothing.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use axum::{Router, middleware, routing::get};
//! use stowage_session::{MemoryStore, Session, SessionCodec, SessionConfig, SessionState};
//!
//! async fn handler(session: Session) -> String {
//!     let visits: u32 = session.get("visits").await.unwrap_or(0) + 1;
//!     session.insert("visits", visits).await.unwrap();
//!     format!("visit #{visits}")
//! }
//!
//! let state = SessionState::new(
//!     Arc::new(MemoryStore::new()),
//!     SessionCodec::new(SessionCodec::generate_key()),
//!     SessionConfig::default(),
//! );
//!
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(middleware::from_fn_with_state(state, session_middleware));
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{
        HeaderMap, HeaderValue, Request,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error};

use crate::codec::SessionCodec;
use crate::config::{ConfigError, SessionConfig};
use crate::error::SessionError;
use crate::key::SessionKey;
use crate::session::Session;
use crate::store::{SessionRecord, SessionStore};

// =============================================================================
// Session State
// =============================================================================

/// State required by the session middleware.
///
/// Cheap to clone; pass it to `axum::middleware::from_fn_with_state`.
#[derive(Clone)]
pub struct SessionState {
    /// Backend the sessions are persisted in.
    pub store: Arc<dyn SessionStore>,

    /// Codec sealing the cookie value and the stored payload.
    pub codec: SessionCodec,

    /// Lifetime and cookie attributes.
    pub config: SessionConfig,
}

impl SessionState {
    /// Creates session state from its parts.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, codec: SessionCodec, config: SessionConfig) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    /// Creates session state from configuration alone, building the codec
    /// from the configured keys.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if validation fails, the primary key
    /// is missing, or any key string cannot be parsed.
    pub fn from_config(
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let primary = config
            .key
            .as_deref()
            .ok_or_else(|| SessionError::from(ConfigError::Missing("session.key".to_string())))?;

        let codec = SessionCodec::from_strings(primary, &config.fallback_keys)
            .map_err(|e| SessionError::configuration(e.to_string()))?;

        Ok(Self::new(store, codec, config))
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("codec", &self.codec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Session middleware: retrieve before the handler, persist after.
///
/// Install with `axum::middleware::from_fn_with_state(state, session_middleware)`.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let session = match retrieve_session(&state, req.headers()).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to load session");
            return e.into_response();
        }
    };

    req.extensions_mut().insert(session.clone());
    let response = next.run(req).await;

    finish_session(&state, &session, response).await
}

/// Resolves the request's session from its cookie header.
///
/// Every unreadable cookie or payload falls back to a new session with a new
/// key; only a store failure is an error.
async fn retrieve_session(
    state: &SessionState,
    headers: &HeaderMap,
) -> Result<Session, SessionError> {
    let cookie_name = &state.config.cookie.name;

    let Some(raw) = extract_session_cookie(headers, cookie_name) else {
        return Ok(Session::new());
    };

    let key = match state.codec.open(cookie_name, &raw) {
        Ok(value) => match SessionKey::parse(&value) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Session cookie unsealed to an invalid key");
                return Ok(Session::new());
            }
        },
        Err(e) => {
            debug!(error = %e, "Session cookie rejected");
            return Ok(Session::new());
        }
    };

    match state.store.load(&key).await? {
        Some(sealed) => {
            let data = match state.codec.open(cookie_name, &sealed) {
                Ok(data) => data,
                Err(e) => {
                    debug!(key = key.prefix(), error = %e, "Stored session payload rejected");
                    return Ok(Session::new());
                }
            };

            match Session::decode(key, &data) {
                Ok(session) => Ok(session),
                Err(e) => {
                    debug!(error = %e, "Stored session data is not a JSON object");
                    Ok(Session::new())
                }
            }
        }
        None => {
            // Cookie was authentic but the row is gone (cleaned up or never
            // persisted). Mint a new key rather than resurrecting the old one.
            debug!(key = key.prefix(), "No session row for presented cookie");
            Ok(Session::new())
        }
    }
}

/// Persists a modified session and sets the response cookie.
///
/// The row is written before the cookie is issued, so a client never holds a
/// cookie for a session that was not stored.
async fn finish_session(state: &SessionState, session: &Session, response: Response) -> Response {
    if !session.is_modified().await {
        return response;
    }

    let data = match session.encode().await {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "Failed to serialize session");
            return e.into_response();
        }
    };

    // The row never holds plaintext: the serialized values are sealed under
    // the same codec (and cookie name) as the cookie value.
    let sealed = match state.codec.seal(&state.config.cookie.name, &data) {
        Ok(sealed) => sealed,
        Err(e) => {
            error!(error = %e, "Failed to seal session payload");
            return SessionError::from(e).into_response();
        }
    };

    let expires_at = OffsetDateTime::now_utc() + state.config.ttl;
    let record = if session.is_new() {
        SessionRecord::fresh(session.key().clone(), sealed, expires_at)
    } else {
        SessionRecord::persisted(session.key().clone(), sealed, expires_at)
    };

    if let Err(e) = state.store.save(&record).await {
        error!(error = %e, key = session.key().prefix(), "Failed to persist session");
        return SessionError::from(e).into_response();
    }

    debug!(
        key = session.key().prefix(),
        fresh = session.is_new(),
        "Session persisted"
    );

    match issue_cookie(state, session.key()) {
        Ok(value) => {
            let mut response = response;
            response.headers_mut().append(SET_COOKIE, value);
            response
        }
        Err(e) => {
            error!(error = %e, "Failed to seal session cookie");
            e.into_response()
        }
    }
}

// =============================================================================
// Cookie Helpers
// =============================================================================

/// Seals the session key and renders the full Set-Cookie value.
fn issue_cookie(state: &SessionState, key: &SessionKey) -> Result<HeaderValue, SessionError> {
    let sealed = state.codec.seal(&state.config.cookie.name, key.as_str())?;
    let cookie = build_session_cookie(&state.config, sealed);

    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| SessionError::codec(format!("Cookie value not header-safe: {e}")))
}

/// Builds the session cookie with the configured attributes.
///
/// Every persist re-sets the cookie, so `Max-Age` is refreshed on each write.
fn build_session_cookie(config: &SessionConfig, value: String) -> Cookie<'static> {
    let max_age = Duration::seconds(config.ttl.as_secs() as i64);

    let mut builder = Cookie::build((config.cookie.name.clone(), value))
        .http_only(config.cookie.http_only)
        .secure(config.cookie.secure)
        .same_site(config.cookie.same_site())
        .path(config.cookie.path.clone())
        .max_age(max_age);

    if let Some(domain) = &config.cookie.domain {
        builder = builder.domain(domain.clone());
    }

    builder.build()
}

/// Extracts the named cookie's value from the Cookie header.
///
/// Parses cookies (simple key=value; key=value format).
fn extract_session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name.trim() == cookie_name
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

// =============================================================================
// Session Extractor
// =============================================================================

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            SessionError::configuration(
                "Session missing from request extensions; is session_middleware installed?",
            )
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

//! # stowage-session
//!
//! Cookie-backed HTTP sessions with pluggable storage.
//!
//! This crate provides:
//! - An opaque, randomly generated session key that is the only thing the
//!   client ever holds
//! - Authenticated encryption (AES-256-GCM) of the cookie value and the
//!   stored payload, with key rotation support
//! - A [`SessionStore`] trait mapping each session to a single backend row,
//!   plus an in-memory implementation for tests and single-process use
//! - Axum middleware that loads the session before the handler and persists
//!   it afterwards, only when it was modified
//!
//! Unreadable cookies never error: a missing, tampered, or stale cookie
//! degrades to a fresh session. Storage failures surface as 500s.
//!
//! ## Modules
//!
//! - [`codec`]: Seal/open cookie values with AES-256-GCM
//! - [`config`]: Session TTL and cookie attribute configuration
//! - [`error`]: Crate error types
//! - [`key`]: Opaque session key generation and parsing
//! - [`memory`]: In-memory store backed by a concurrent map
//! - [`middleware`]: Axum middleware and the `Session` extractor
//! - [`session`]: The per-request session value map
//! - [`store`]: The `SessionStore` trait and persistence record
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use axum::{Router, middleware, routing::get};
//! use stowage_session::{
//!     MemoryStore, Session, SessionCodec, SessionConfig, SessionState, session_middleware,
//! };
//!
//! async fn visits(session: Session) -> String {
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
//! let app: Router = Router::new()
//!     .route("/", get(visits))
//!     .layer(middleware::from_fn_with_state(state, session_middleware));
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod middleware;
pub mod session;
pub mod store;

pub use codec::{CodecError, KEY_SIZE, SessionCodec};
pub use config::{ConfigError, CookieConfig, SessionConfig};
pub use error::SessionError;
pub use key::{InvalidSessionKey, SessionKey};
pub use memory::MemoryStore;
pub use middleware::{SessionState, session_middleware};
pub use session::Session;
pub use store::{SessionRecord, SessionStore, StoreError};

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

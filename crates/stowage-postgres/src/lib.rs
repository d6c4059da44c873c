//! # stowage-postgres
//!
//! PostgreSQL storage backend for `stowage-session`.
//!
//! This crate provides:
//! - [`PostgresSessionStore`]: a [`stowage_session::SessionStore`] keeping
//!   each session in a single row of a configurable table
//! - Idempotent schema setup via [`PostgresSessionStore::create_table_if_missing`]
//! - Connection pool construction from [`PostgresConfig`]
//!
//! ## Usage
//!
//! ```ignore
//! use stowage_postgres::{PostgresConfig, PostgresSessionStore};
//!
//! let config = PostgresConfig::new("postgres://localhost/app");
//! let store = PostgresSessionStore::connect(&config).await?;
//! store.create_table_if_missing().await?;
//! ```

pub mod config;
pub mod pool;
pub mod store;

pub use config::{DEFAULT_TABLE, PostgresConfig};
pub use pool::{PgPool, PgPoolOptions, create_pool};
pub use store::PostgresSessionStore;

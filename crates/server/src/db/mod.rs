//! Storage for users, catalog items, carts and orders.
//!
//! # Backends
//!
//! - [`postgres::PgStore`] - `PostgreSQL` via `sqlx` (production)
//! - [`memory::MemoryStore`] - in-process maps (tests, local development)
//!
//! Both implement [`Store`]; components receive the store explicitly rather
//! than reaching for a global handle.
//!
//! ## Tables
//!
//! - `users` - Registered identities and their current session token
//! - `items` - Catalog (soft-deleted via `deleted_at`)
//! - `carts` - One row per user, reused across orders
//! - `cart_lines` - Unique per `(cart_id, item_id)`
//! - `orders` - Immutable conversion records
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p cartline-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    CartRepository, CatalogGateway, Conversion, LineRemoval, OrderRepository, Store,
    UserRepository,
};

/// Postgres SQLSTATE for `numeric_value_out_of_range`.
const SQLSTATE_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A value does not fit its column (e.g., accumulated quantity).
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl RepositoryError {
    /// Classify a write error, turning unique and range violations into
    /// domain variants.
    pub(crate) fn from_write(e: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.code().as_deref() == Some(SQLSTATE_OUT_OF_RANGE) {
                return Self::OutOfRange(db_err.message().to_owned());
            }
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

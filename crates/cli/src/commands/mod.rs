//! Command implementations.
//!
//! Every command reads the same environment as the server
//! (`CARTLINE_DATABASE_URL` or `DATABASE_URL`, `CARTLINE_SESSION_SECRET`, ...)
//! and only operates on `PostgreSQL` storage.

pub mod migrate;
pub mod seed;
pub mod user;

use cartline_server::config::{ConfigError, ServerConfig, StorageConfig};
use cartline_server::db::{self, PgStore};
use cartline_server::services::{AuthError, CatalogError, SessionError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The configured backend has nothing to migrate or seed.
    #[error("CARTLINE_STORAGE=memory is not persistent; commands need postgres")]
    NotPersistent,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("User error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session configuration error: {0}")]
    Session(#[from] SessionError),
}

/// Load configuration and connect to the configured database.
async fn connect() -> Result<(ServerConfig, PgStore), CliError> {
    let config = ServerConfig::from_env()?;

    let StorageConfig::Postgres { database_url } = &config.storage else {
        return Err(CliError::NotPersistent);
    };

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(database_url).await?;
    Ok((config, PgStore::new(pool)))
}

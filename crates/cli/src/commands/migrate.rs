//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cartline-cli migrate
//! ```
//!
//! Migrations live in `crates/server/migrations/` and are embedded at build
//! time.

use super::{CliError, connect};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let (_config, store) = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations")
        .run(store.pool())
        .await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

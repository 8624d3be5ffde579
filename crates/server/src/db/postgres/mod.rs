//! `PostgreSQL` storage backend.
//!
//! Queries are checked at runtime (`sqlx::query_as` with `FromRow` row types),
//! so the crate builds without a live database. Rows are converted into
//! validated domain models here; a value that fails validation is reported as
//! `RepositoryError::DataCorruption`.

mod carts;
mod catalog;
mod orders;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use super::store::Store;

/// Storage backend backed by a `PgPool`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Map a text column into a parsed enum, flagging bad values as corruption.
fn parse_column<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("{column}: {e}")))
}

//! Seed the catalog with the default items.

use tracing::info;

use cartline_server::services::CatalogService;

use super::{CliError, connect};

/// Insert the default catalog when the catalog is empty.
///
/// Running it again is a no-op.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn catalog() -> Result<(), CliError> {
    let (_config, store) = connect().await?;

    let inserted = CatalogService::new(&store).seed_defaults().await?;
    if inserted == 0 {
        info!("Catalog already has items, nothing seeded");
    } else {
        info!(inserted, "Catalog seeded");
    }

    Ok(())
}

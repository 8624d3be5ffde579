//! Catalog management and the default seed data.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use cartline_core::ItemId;

use crate::db::{CatalogGateway, RepositoryError};
use crate::models::item::ItemValidationError;
use crate::models::{Item, NewItem};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The item input failed validation.
    #[error(transparent)]
    Invalid(#[from] ItemValidationError),

    /// No live item with this ID.
    #[error("item not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog reads and writes.
pub struct CatalogService<'a, S: CatalogGateway + ?Sized> {
    catalog: &'a S,
}

impl<'a, S: CatalogGateway + ?Sized> CatalogService<'a, S> {
    #[must_use]
    pub const fn new(catalog: &'a S) -> Self {
        Self { catalog }
    }

    /// All live items.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Item>, CatalogError> {
        Ok(self.catalog.list_items().await?)
    }

    /// Validate and insert an item.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if a field is invalid.
    #[instrument(skip(self, item))]
    pub async fn create(&self, item: NewItem) -> Result<Item, CatalogError> {
        let item = item.validate()?;
        let created = self.catalog.create_item(&item).await?;
        info!(item_id = %created.id, name = %created.name, "Item created");
        Ok(created)
    }

    /// Soft-delete an item.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the item is unknown or already deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ItemId) -> Result<(), CatalogError> {
        if !self.catalog.delete_item(id).await? {
            return Err(CatalogError::NotFound);
        }
        info!(item_id = %id, "Item deleted");
        Ok(())
    }

    /// Insert [`default_catalog`] if the catalog is empty.
    ///
    /// Returns the number of items inserted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn seed_defaults(&self) -> Result<usize, CatalogError> {
        if self.catalog.count_items().await? > 0 {
            return Ok(0);
        }

        let items = default_catalog();
        for item in &items {
            self.catalog.create_item(item).await?;
        }
        info!(count = items.len(), "Catalog seeded");
        Ok(items.len())
    }
}

fn seed_item(
    name: &str,
    description: &str,
    price_cents: i64,
    category: &str,
    rating: f64,
    reviews: i32,
    image: &str,
) -> NewItem {
    NewItem {
        name: name.to_owned(),
        description: description.to_owned(),
        price: Decimal::new(price_cents, 2),
        category: category.to_owned(),
        rating,
        reviews,
        image: image.to_owned(),
        in_stock: true,
    }
}

/// The five items a fresh catalog starts with.
#[must_use]
pub fn default_catalog() -> Vec<NewItem> {
    vec![
        seed_item(
            "Premium Wireless Headphones",
            "High-quality wireless headphones with active noise cancellation and 30-hour battery life",
            29_999,
            "Electronics",
            4.8,
            1247,
            "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?w=400&h=300&fit=crop",
        ),
        seed_item(
            "Smart Fitness Watch",
            "Advanced fitness tracking with heart rate monitoring, GPS, and 7-day battery life",
            19_999,
            "Electronics",
            4.6,
            892,
            "https://images.unsplash.com/photo-1523275335684-37898b6baf30?w=400&h=300&fit=crop",
        ),
        seed_item(
            "Ergonomic Office Chair",
            "Premium ergonomic office chair with adjustable lumbar support and memory foam cushion",
            44_999,
            "Furniture",
            4.7,
            456,
            "https://images.unsplash.com/photo-1567538096630-e0c55bd6374c?w=400&h=300&fit=crop",
        ),
        seed_item(
            "Organic Coffee Beans",
            "Premium organic coffee beans from sustainable farms in Colombia",
            2_499,
            "Food & Beverages",
            4.9,
            2341,
            "https://images.unsplash.com/photo-1559056199-641a0ac8b55e?w=400&h=300&fit=crop",
        ),
        seed_item(
            "Professional Camera Lens",
            "85mm f/1.4 portrait lens with beautiful bokeh and exceptional sharpness",
            89_999,
            "Electronics",
            4.9,
            567,
            "https://images.unsplash.com/photo-1516035069371-29a1b244cc32?w=400&h=300&fit=crop",
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_default_catalog_is_valid() {
        for item in default_catalog() {
            let validated = item.clone().validate().unwrap();
            assert_eq!(validated, item);
        }
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        assert_eq!(catalog.seed_defaults().await.unwrap(), 5);
        assert_eq!(catalog.seed_defaults().await.unwrap(), 0);
        assert_eq!(catalog.list().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let bad = NewItem {
            name: String::new(),
            ..default_catalog().remove(0)
        };
        assert!(matches!(
            catalog.create(bad).await,
            Err(CatalogError::Invalid(ItemValidationError::EmptyName))
        ));

        let item = catalog.create(default_catalog().remove(1)).await.unwrap();
        catalog.delete(item.id).await.unwrap();
        assert!(matches!(
            catalog.delete(item.id).await,
            Err(CatalogError::NotFound)
        ));
        assert!(catalog.list().await.unwrap().is_empty());
    }
}

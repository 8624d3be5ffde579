//! Catalog queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use cartline_core::ItemId;

use super::PgStore;
use crate::db::RepositoryError;
use crate::db::store::CatalogGateway;
use crate::models::{Item, NewItem};

const ITEM_COLUMNS: &str = "id, name, description, price, category, rating, reviews, image, \
                            in_stock, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: ItemId,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    rating: f64,
    reviews: i32,
    image: String,
    in_stock: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            rating: row.rating,
            reviews: row.reviews,
            image: row.image,
            in_stock: row.in_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CatalogGateway for PgStore {
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Item::from))
    }

    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ItemId::as_i32).collect();

        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE id = ANY($1) AND deleted_at IS NULL ORDER BY id"
        ))
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE deleted_at IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    #[instrument(skip(self, item), fields(name = %item.name))]
    async fn create_item(&self, item: &NewItem) -> Result<Item, RepositoryError> {
        let row: ItemRow = sqlx::query_as(&format!(
            "INSERT INTO items \
                 (name, description, price, category, rating, reviews, image, in_stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(&item.category)
        .bind(item.rating)
        .bind(item.reviews)
        .bind(&item.image)
        .bind(item.in_stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "item already exists"))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE items SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_items(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

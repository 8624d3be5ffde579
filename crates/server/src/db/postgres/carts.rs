//! Cart and cart line queries.
//!
//! `add_line` and `remove_line` run in a transaction holding the cart row lock
//! (`FOR UPDATE`), so concurrent requests from one user are serialized on the
//! cart row and quantity accumulation never loses an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::instrument;

use cartline_core::{CartEvent, CartId, CartLineId, CartStatus, ItemId, Quantity, UserId};

use super::{PgStore, parse_column};
use crate::db::RepositoryError;
use crate::db::store::{CartRepository, LineRemoval};
use crate::models::{Cart, CartLine};

pub(super) const CART_COLUMNS: &str = "id, user_id, name, status, created_at, updated_at";
pub(super) const LINE_COLUMNS: &str =
    "id, cart_id, item_id, quantity, price, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(super) struct CartRow {
    id: CartId,
    user_id: UserId,
    name: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            status: parse_column(&row.status, "carts.status")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct LineRow {
    id: CartLineId,
    cart_id: CartId,
    item_id: ItemId,
    quantity: i32,
    price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(row.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("cart_lines.quantity: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            item_id: row.item_id,
            quantity,
            price: row.price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Lock the user's cart row for the rest of the transaction.
pub(super) async fn lock_cart(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<Option<Cart>, RepositoryError> {
    let row: Option<CartRow> = sqlx::query_as(&format!(
        "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(Cart::try_from).transpose()
}

/// Persist a status transition on a locked cart.
pub(super) async fn save_status(
    tx: &mut Transaction<'_, Postgres>,
    cart: &Cart,
    status: CartStatus,
) -> Result<Cart, RepositoryError> {
    let row: CartRow = sqlx::query_as(&format!(
        "UPDATE carts SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {CART_COLUMNS}"
    ))
    .bind(cart.id)
    .bind(status.as_str())
    .fetch_one(&mut **tx)
    .await?;

    row.try_into()
}

fn transition(cart: &Cart, event: CartEvent) -> Result<CartStatus, RepositoryError> {
    cart.status
        .apply(event)
        .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

#[async_trait]
impl CartRepository for PgStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn get_carts(&self, ids: &[CartId]) -> Result<Vec<Cart>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(CartId::as_i32).collect();

        let rows: Vec<CartRow> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Cart::try_from).collect()
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, RepositoryError> {
        let rows: Vec<CartRow> =
            sqlx::query_as(&format!("SELECT {CART_COLUMNS} FROM carts ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Cart::try_from).collect()
    }

    async fn cart_lines(&self, cart_ids: &[CartId]) -> Result<Vec<CartLine>, RepositoryError> {
        if cart_ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = cart_ids.iter().map(CartId::as_i32).collect();

        let rows: Vec<LineRow> = sqlx::query_as(&format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines WHERE cart_id = ANY($1) ORDER BY id"
        ))
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    #[instrument(skip(self, unit_price))]
    async fn add_line(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: Quantity,
        unit_price: Decimal,
    ) -> Result<(Cart, CartLine), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Get-or-create is one statement; the unique user_id makes a racing
        // insert a no-op, after which both requests lock the same row.
        sqlx::query(
            "INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart already exists"))?;

        let cart = lock_cart(&mut tx, user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let status = transition(&cart, CartEvent::ItemAdded)?;
        let cart = save_status(&mut tx, &cart, status).await?;

        sqlx::query(
            "UPDATE users SET cart_id = $2 WHERE id = $1 AND cart_id IS DISTINCT FROM $2",
        )
        .bind(user_id)
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;

        let line: LineRow = sqlx::query_as(&format!(
            "INSERT INTO cart_lines (cart_id, item_id, quantity, price) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (cart_id, item_id) DO UPDATE \
                 SET quantity = cart_lines.quantity + EXCLUDED.quantity, \
                     updated_at = NOW() \
             RETURNING {LINE_COLUMNS}"
        ))
        .bind(cart.id)
        .bind(item_id)
        .bind(quantity.get())
        .bind(unit_price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart line already exists"))?;

        tx.commit().await?;

        Ok((cart, line.try_into()?))
    }

    #[instrument(skip(self))]
    async fn remove_line(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<LineRemoval, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(cart) = lock_cart(&mut tx, user_id).await? else {
            return Ok(LineRemoval::NoCart);
        };

        let result = sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1 AND item_id = $2")
            .bind(cart.id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        let outcome = if result.rows_affected() == 0 {
            LineRemoval::NotPresent
        } else {
            let status = transition(&cart, CartEvent::ItemRemoved)?;
            save_status(&mut tx, &cart, status).await?;
            LineRemoval::Removed
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

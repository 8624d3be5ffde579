//! Order queries and the cart-to-order conversion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use cartline_core::{CartEvent, CartId, OrderId, OrderStatus, UserId, order_total};

use super::carts::{LINE_COLUMNS, LineRow, lock_cart, save_status};
use super::{PgStore, parse_column};
use crate::db::RepositoryError;
use crate::db::store::{Conversion, OrderRepository};
use crate::models::{CartLine, Order};

const ORDER_COLUMNS: &str = "id, cart_id, user_id, total, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    cart_id: CartId,
    user_id: UserId,
    total: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            user_id: row.user_id,
            total: row.total,
            status: parse_column(&row.status, "orders.status")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    #[instrument(skip(self))]
    async fn convert_active_cart(&self, user_id: UserId) -> Result<Conversion, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(cart) = lock_cart(&mut tx, user_id).await? else {
            return Ok(Conversion::NoCart);
        };

        let rows: Vec<LineRow> = sqlx::query_as(&format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines WHERE cart_id = $1 ORDER BY id"
        ))
        .bind(cart.id)
        .fetch_all(&mut *tx)
        .await?;
        let lines = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if lines.is_empty() {
            return Ok(Conversion::EmptyCart(cart));
        }

        let total = order_total(lines.iter().map(|l| (l.price, l.quantity)))
            .map_err(|e| RepositoryError::OutOfRange(e.to_string()))?;
        let status = cart
            .status
            .apply(CartEvent::Converted)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (cart_id, user_id, total, status) \
             VALUES ($1, $2, $3, $4) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(cart.id)
        .bind(user_id)
        .bind(total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order already exists"))?;
        let order = Order::try_from(row)?;

        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart.id)
            .execute(&mut *tx)
            .await?;

        let cart = save_status(&mut tx, &cart, status).await?;

        tx.commit().await?;

        Ok(Conversion::Converted { order, cart })
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Order::try_from).collect()
    }
}

//! Order domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cartline_core::{CartId, OrderId, OrderStatus, UserId};

/// Immutable snapshot of a cart's value at conversion time.
///
/// `total` is computed once from the cart lines' stored prices and is never
/// recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Cart the order was converted from.
    pub cart_id: CartId,
    pub user_id: UserId,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cartline_core::{CartId, CartLineId, CartStatus, ItemId, Quantity, UserId};

/// Default display name given to newly created carts.
pub const DEFAULT_CART_NAME: &str = "Shopping Cart";

/// A user's cart.
///
/// Exactly one per user. Created lazily on the first item added and kept
/// (emptied, `Converted`) after each order conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    /// Owner; only this user may mutate the cart.
    pub user_id: UserId,
    pub name: String,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One item on a cart.
///
/// At most one line exists per `(cart_id, item_id)`; repeated additions
/// accumulate `quantity`. `price` is the unit price captured when the line was
/// first created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub item_id: ItemId,
    pub quantity: Quantity,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

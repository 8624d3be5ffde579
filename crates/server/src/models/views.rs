//! Read-side projections joining carts, lines, items, users and orders.
//!
//! These are what listing endpoints serialize. Lines whose catalog item has
//! been deleted carry `item: None`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cartline_core::{
    CartId, CartLineId, CartStatus, ItemId, OrderId, OrderStatus, PriceError, Quantity, UserId,
    Username, line_total, order_total,
};

use super::{Cart, CartLine, Item, Order, User};

/// Public view of a user. Carries no password hash and no token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: Username,
    pub cart_id: Option<CartId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            cart_id: user.cart_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Item display data attached to a cart line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image: String,
    /// Current catalog price; may differ from the line's captured price.
    pub price: Decimal,
    pub in_stock: bool,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            image: item.image.clone(),
            price: item.price,
            in_stock: item.in_stock,
        }
    }
}

/// A cart line expanded with its item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineView {
    pub id: CartLineId,
    pub item_id: ItemId,
    pub quantity: Quantity,
    /// Unit price captured when the line was created.
    pub price: Decimal,
    pub line_total: Decimal,
    pub item: Option<ItemSummary>,
}

/// A cart with its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub user_id: UserId,
    pub name: String,
    pub status: CartStatus,
    pub lines: Vec<CartLineView>,
    /// Sum of line quantities.
    pub item_count: i64,
    /// Sum of line totals at captured prices.
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owner, filled in for administrative listings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

impl CartView {
    /// Join a cart with its lines and the catalog items they reference.
    ///
    /// `lines` may contain lines of other carts; only this cart's are kept.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if a line total overflows.
    pub fn assemble(
        cart: &Cart,
        lines: &[CartLine],
        items: &HashMap<ItemId, Item>,
    ) -> Result<Self, PriceError> {
        let own: Vec<&CartLine> = lines.iter().filter(|l| l.cart_id == cart.id).collect();

        let line_views = own
            .iter()
            .map(|line| {
                Ok(CartLineView {
                    id: line.id,
                    item_id: line.item_id,
                    quantity: line.quantity,
                    price: line.price,
                    line_total: line_total(line.price, line.quantity)?,
                    item: items.get(&line.item_id).map(ItemSummary::from),
                })
            })
            .collect::<Result<Vec<_>, PriceError>>()?;

        let subtotal = order_total(own.iter().map(|l| (l.price, l.quantity)))?;
        let item_count = own.iter().map(|l| i64::from(l.quantity.get())).sum();

        Ok(Self {
            id: cart.id,
            user_id: cart.user_id,
            name: cart.name.clone(),
            status: cart.status,
            lines: line_views,
            item_count,
            subtotal,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
            user: None,
        })
    }

    /// Attach the owner for administrative listings.
    #[must_use]
    pub fn with_user(mut self, user: Option<UserSummary>) -> Self {
        self.user = user;
        self
    }
}

/// An order expanded with its source cart.
///
/// The cart shows its *current* lines, which are empty right after the
/// conversion and may later hold a new, unrelated selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub cart_id: CartId,
    pub user_id: UserId,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cart: Option<CartView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

impl OrderView {
    /// Build a view from an order and its (optional) expanded cart.
    #[must_use]
    pub fn new(order: &Order, cart: Option<CartView>, user: Option<UserSummary>) -> Self {
        Self {
            id: order.id,
            cart_id: order.cart_id,
            user_id: order.user_id,
            total: order.total,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
            cart,
            user,
        }
    }
}

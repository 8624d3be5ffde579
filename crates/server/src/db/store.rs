//! Repository traits implemented by every storage backend.
//!
//! Operations that must be atomic (`add_line`, `remove_line`,
//! `convert_active_cart`) are single trait methods so each backend can wrap
//! them in its own transaction primitive.

use async_trait::async_trait;
use rust_decimal::Decimal;

use cartline_core::{CartId, ItemId, Quantity, UserId, Username};

use super::RepositoryError;
use crate::models::{Cart, CartLine, Item, NewItem, Order, User};

/// Result of removing a line from a user's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRemoval {
    /// The user has no cart at all.
    NoCart,
    /// A line was deleted.
    Removed,
    /// The cart exists but held no line for the item.
    NotPresent,
}

/// Result of converting a user's cart into an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// The user has no cart.
    NoCart,
    /// The cart has no lines; nothing was written.
    EmptyCart(Cart),
    /// The order was written and the cart emptied in one transaction.
    Converted {
        /// The new order.
        order: Order,
        /// The cart after conversion (no lines, `Converted`).
        cart: Cart,
    },
}

/// Persistence for registered identities.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create_user(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Look up a user and their password hash by username.
    async fn get_credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Look up a user and their stored session token by ID.
    async fn get_with_token(
        &self,
        id: UserId,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError>;

    /// Overwrite the user's stored session token.
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    async fn set_token(&self, id: UserId, token: &str) -> Result<(), RepositoryError>;

    /// All users ordered by ID.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;
}

/// Read-mostly access to the catalog.
///
/// Deleted items are invisible to every lookup.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Current item data, or `None` if unknown or deleted.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;

    /// Items for the given IDs; unknown or deleted IDs are skipped.
    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, RepositoryError>;

    /// All live items ordered by ID.
    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError>;

    /// Insert a validated item.
    async fn create_item(&self, item: &NewItem) -> Result<Item, RepositoryError>;

    /// Soft-delete an item. Returns `false` if it was unknown or already deleted.
    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError>;

    /// Number of live items.
    async fn count_items(&self) -> Result<i64, RepositoryError>;
}

/// Persistence for carts and their lines.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's cart, if one was ever created.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Carts with the given IDs.
    async fn get_carts(&self, ids: &[CartId]) -> Result<Vec<Cart>, RepositoryError>;

    /// All carts ordered by ID.
    async fn list_carts(&self) -> Result<Vec<Cart>, RepositoryError>;

    /// Lines of the given carts ordered by line ID.
    async fn cart_lines(&self, cart_ids: &[CartId]) -> Result<Vec<CartLine>, RepositoryError>;

    /// Atomically get-or-create the user's cart and add `quantity` of an item.
    ///
    /// An existing line for the item has its quantity increased and keeps its
    /// captured price; otherwise a line is inserted at `unit_price`.
    ///
    /// Returns `RepositoryError::OutOfRange` if the accumulated quantity no
    /// longer fits the column.
    async fn add_line(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: Quantity,
        unit_price: Decimal,
    ) -> Result<(Cart, CartLine), RepositoryError>;

    /// Atomically delete the line for an item from the user's cart.
    async fn remove_line(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<LineRemoval, RepositoryError>;
}

/// Persistence for orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// In one transaction: total the cart's lines at their stored prices,
    /// insert a pending order, delete the lines and mark the cart converted.
    async fn convert_active_cart(&self, user_id: UserId) -> Result<Conversion, RepositoryError>;

    /// The user's orders ordered by ID.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// All orders ordered by ID.
    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError>;
}

/// A complete storage backend.
#[async_trait]
pub trait Store: UserRepository + CatalogGateway + CartRepository + OrderRepository {
    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

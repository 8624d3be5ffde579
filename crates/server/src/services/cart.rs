//! Cart management.
//!
//! Each user owns at most one cart, created on the first item added. Adding an
//! item already on the cart increases that line's quantity and keeps the unit
//! price captured when the line was created.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, instrument};

use cartline_core::{ItemId, PriceError, Quantity, QuantityError, UserId};

use crate::db::{CartRepository, CatalogGateway, LineRemoval, RepositoryError};
use crate::models::{Cart, CartLine, CartView};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The requested quantity is not a positive integer that fits storage.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// The catalog has no live item with this ID.
    #[error("item not found")]
    ItemNotFound,

    /// The user has no cart yet.
    #[error("cart not found")]
    CartNotFound,

    /// The accumulated quantity no longer fits storage.
    #[error("quantity too large: {0}")]
    QuantityOverflow(String),

    /// A line or cart total could not be computed.
    #[error("price calculation failed: {0}")]
    Pricing(#[from] PriceError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::OutOfRange(msg) => Self::QuantityOverflow(msg),
            other => Self::Repository(other),
        }
    }
}

/// Cart operations for authenticated users.
pub struct CartService<'a, S: CartRepository + CatalogGateway + ?Sized> {
    store: &'a S,
}

impl<'a, S: CartRepository + CatalogGateway + ?Sized> CartService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add `quantity` units of an item to the user's cart.
    ///
    /// Creates the cart if the user has none. Nothing is written when the
    /// quantity or item is invalid.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity < 1`.
    /// Returns `CartError::ItemNotFound` if the item is unknown or deleted.
    /// Returns `CartError::QuantityOverflow` if the merged quantity is too large.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<CartLine, CartError> {
        let quantity = Quantity::new(quantity)?;

        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        let (cart, line) = self
            .store
            .add_line(user_id, item.id, quantity, item.price)
            .await?;

        info!(
            cart_id = %cart.id,
            item_id = %item.id,
            added = %quantity,
            quantity = %line.quantity,
            "Item added to cart"
        );
        Ok(line)
    }

    /// Remove an item's line from the user's cart.
    ///
    /// Removing an item that is not on the cart succeeds without changes.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the user has no cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: ItemId) -> Result<(), CartError> {
        match self.store.remove_line(user_id, item_id).await? {
            LineRemoval::NoCart => Err(CartError::CartNotFound),
            LineRemoval::Removed => {
                info!(item_id = %item_id, "Item removed from cart");
                Ok(())
            }
            LineRemoval::NotPresent => {
                debug!(item_id = %item_id, "Item was not on cart");
                Ok(())
            }
        }
    }

    /// The user's cart with its lines expanded.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the user has no cart.
    pub async fn active_cart(&self, user_id: UserId) -> Result<CartView, CartError> {
        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;

        let mut views = self.expand(std::slice::from_ref(&cart)).await?;
        views.pop().ok_or(CartError::CartNotFound)
    }

    /// Every cart in the system, expanded.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn list_all_carts(&self) -> Result<Vec<CartView>, CartError> {
        let carts = self.store.list_carts().await?;
        self.expand(&carts).await
    }

    /// Join carts with their lines and the items those lines reference.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Pricing` if a total overflows.
    pub async fn expand(&self, carts: &[Cart]) -> Result<Vec<CartView>, CartError> {
        if carts.is_empty() {
            return Ok(Vec::new());
        }

        let cart_ids: Vec<_> = carts.iter().map(|c| c.id).collect();
        let lines = self.store.cart_lines(&cart_ids).await?;

        let mut item_ids: Vec<ItemId> = lines.iter().map(|l| l.item_id).collect();
        item_ids.sort_unstable();
        item_ids.dedup();
        let items: HashMap<_, _> = self
            .store
            .get_items(&item_ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        carts
            .iter()
            .map(|cart| CartView::assemble(cart, &lines, &items).map_err(CartError::from))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use cartline_core::{CartStatus, Username};

    use super::*;
    use crate::db::{MemoryStore, UserRepository};
    use crate::services::catalog::default_catalog;

    async fn setup() -> (MemoryStore, UserId) {
        let store = MemoryStore::with_items(&default_catalog());
        let user = store
            .create_user(&Username::parse("alice").unwrap(), "hash")
            .await
            .unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn test_repeated_adds_merge_into_one_line() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);
        let item = ItemId::new(1);

        carts.add_item(user, item, 2).await.unwrap();
        carts.add_item(user, item, 3).await.unwrap();

        let cart = carts.active_cart(user).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity.get(), 5);
        assert_eq!(cart.item_count, 5);
        assert_eq!(cart.subtotal, Decimal::new(29_999, 2) * Decimal::from(5));
        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(
            cart.lines[0].item.as_ref().map(|i| i.name.as_str()),
            Some("Premium Wireless Headphones")
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_captured_price() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);
        let item = ItemId::new(2);

        carts.add_item(user, item, 1).await.unwrap();
        store.set_price(item, Decimal::new(100, 0)).await;
        let line = carts.add_item(user, item, 1).await.unwrap();

        assert_eq!(line.price, Decimal::new(19_999, 2));
        let cart = carts.active_cart(user).await.unwrap();
        assert_eq!(cart.subtotal, Decimal::new(39_998, 2));
        // The expanded item shows the current catalog price.
        assert_eq!(
            cart.lines[0].item.as_ref().map(|i| i.price),
            Some(Decimal::new(100, 0))
        );
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);

        assert!(matches!(
            carts.add_item(user, ItemId::new(1), 0).await,
            Err(CartError::InvalidQuantity(_))
        ));
        assert!(matches!(
            carts.add_item(user, ItemId::new(1), -3).await,
            Err(CartError::InvalidQuantity(_))
        ));
        assert!(store.get_cart(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_item_creates_nothing() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);

        assert!(matches!(
            carts.add_item(user, ItemId::new(999), 1).await,
            Err(CartError::ItemNotFound)
        ));
        assert!(matches!(
            carts.active_cart(user).await,
            Err(CartError::CartNotFound)
        ));
        assert!(store.list_carts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_item_cannot_be_added() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);
        store.delete_item(ItemId::new(3)).await.unwrap();

        assert!(matches!(
            carts.add_item(user, ItemId::new(3), 1).await,
            Err(CartError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_once_cart_exists() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);

        assert!(matches!(
            carts.remove_item(user, ItemId::new(1)).await,
            Err(CartError::CartNotFound)
        ));

        carts.add_item(user, ItemId::new(1), 1).await.unwrap();
        carts.remove_item(user, ItemId::new(4)).await.unwrap();
        assert_eq!(carts.active_cart(user).await.unwrap().lines.len(), 1);

        carts.remove_item(user, ItemId::new(1)).await.unwrap();
        carts.remove_item(user, ItemId::new(1)).await.unwrap();
        assert!(carts.active_cart(user).await.unwrap().lines.is_empty());
    }

    #[tokio::test]
    async fn test_lines_of_deleted_items_expand_without_details() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);

        carts.add_item(user, ItemId::new(5), 1).await.unwrap();
        store.delete_item(ItemId::new(5)).await.unwrap();

        let cart = carts.active_cart(user).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert!(cart.lines[0].item.is_none());
    }

    #[tokio::test]
    async fn test_list_all_carts() {
        let (store, alice) = setup().await;
        let bob = store
            .create_user(&Username::parse("bob").unwrap(), "hash")
            .await
            .unwrap()
            .id;
        let carts = CartService::new(&store);

        carts.add_item(alice, ItemId::new(1), 1).await.unwrap();
        carts.add_item(bob, ItemId::new(2), 2).await.unwrap();

        let all = carts.list_all_carts().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, alice);
        assert_eq!(all[1].user_id, bob);
        assert_eq!(all[1].item_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_share_one_cart_and_line() {
        const ADDS: i32 = 32;

        let (store, user) = setup().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..ADDS)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    CartService::new(&*store)
                        .add_item(user, ItemId::new(1), 1)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let all = store.list_carts().await.unwrap();
        assert_eq!(all.len(), 1);
        let lines = store.cart_lines(&[all[0].id]).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity.get(), ADDS);
    }
}

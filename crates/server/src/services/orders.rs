//! Cart-to-order conversion and order listings.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, instrument};

use cartline_core::UserId;

use super::cart::{CartError, CartService};
use crate::db::{CartRepository, CatalogGateway, Conversion, OrderRepository, RepositoryError};
use crate::models::{Order, OrderView};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The user has no cart.
    #[error("cart not found")]
    CartNotFound,

    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The order total is not representable.
    #[error("order total out of range: {0}")]
    TotalOutOfRange(String),

    /// Expanding the source cart failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for OrderError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::OutOfRange(msg) => Self::TotalOutOfRange(msg),
            other => Self::Repository(other),
        }
    }
}

/// Order operations.
pub struct OrderService<'a, S>
where
    S: OrderRepository + CartRepository + CatalogGateway + ?Sized,
{
    store: &'a S,
}

impl<'a, S> OrderService<'a, S>
where
    S: OrderRepository + CartRepository + CatalogGateway + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Convert the user's cart into a pending order and empty the cart.
    ///
    /// The total is the sum of each line's captured price times its quantity.
    /// Writing the order and clearing the lines happen atomically.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::CartNotFound` if the user has no cart.
    /// Returns `OrderError::EmptyCart` if the cart has no lines.
    #[instrument(skip(self))]
    pub async fn convert(&self, user_id: UserId) -> Result<Order, OrderError> {
        match self.store.convert_active_cart(user_id).await? {
            Conversion::NoCart => Err(OrderError::CartNotFound),
            Conversion::EmptyCart(_) => Err(OrderError::EmptyCart),
            Conversion::Converted { order, cart } => {
                info!(
                    order_id = %order.id,
                    cart_id = %cart.id,
                    total = %order.total,
                    "Order created"
                );
                Ok(order)
            }
        }
    }

    /// All orders of one user, each with its source cart as it is now.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderView>, OrderError> {
        let orders = self.store.orders_for_user(user_id).await?;
        self.expand(&orders).await
    }

    /// Every order in the system.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn list_all_orders(&self) -> Result<Vec<OrderView>, OrderError> {
        let orders = self.store.list_orders().await?;
        self.expand(&orders).await
    }

    async fn expand(&self, orders: &[Order]) -> Result<Vec<OrderView>, OrderError> {
        let mut cart_ids: Vec<_> = orders.iter().map(|o| o.cart_id).collect();
        cart_ids.sort_unstable();
        cart_ids.dedup();

        let carts = self.store.get_carts(&cart_ids).await?;
        let views: HashMap<_, _> = CartService::new(self.store)
            .expand(&carts)
            .await?
            .into_iter()
            .map(|view| (view.id, view))
            .collect();

        Ok(orders
            .iter()
            .map(|order| OrderView::new(order, views.get(&order.cart_id).cloned(), None))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use cartline_core::{CartStatus, ItemId, OrderStatus, Username};

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
    async fn test_convert_without_cart() {
        let (store, user) = setup().await;
        let orders = OrderService::new(&store);

        assert!(matches!(
            orders.convert(user).await,
            Err(OrderError::CartNotFound)
        ));
    }

    #[tokio::test]
    async fn test_convert_empty_cart() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);
        let orders = OrderService::new(&store);

        carts.add_item(user, ItemId::new(1), 1).await.unwrap();
        carts.remove_item(user, ItemId::new(1)).await.unwrap();

        assert!(matches!(orders.convert(user).await, Err(OrderError::EmptyCart)));
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_convert_uses_captured_prices_and_empties_cart() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);
        let orders = OrderService::new(&store);

        carts.add_item(user, ItemId::new(1), 2).await.unwrap();
        carts.add_item(user, ItemId::new(4), 3).await.unwrap();
        store.set_price(ItemId::new(1), Decimal::new(1, 0)).await;

        let order = orders.convert(user).await.unwrap();
        let expected = Decimal::new(29_999, 2) * Decimal::from(2) + Decimal::new(2_499, 2) * Decimal::from(3);
        assert_eq!(order.total, expected);
        assert_eq!(order.status, OrderStatus::Pending);

        let cart = carts.active_cart(user).await.unwrap();
        assert!(cart.lines.is_empty());
        assert_eq!(cart.status, CartStatus::Converted);
        assert_eq!(cart.id, order.cart_id);
    }

    #[tokio::test]
    async fn test_cart_is_reused_after_conversion() {
        let (store, user) = setup().await;
        let carts = CartService::new(&store);
        let orders = OrderService::new(&store);

        carts.add_item(user, ItemId::new(2), 1).await.unwrap();
        let first = orders.convert(user).await.unwrap();
        assert!(matches!(orders.convert(user).await, Err(OrderError::EmptyCart)));

        carts.add_item(user, ItemId::new(3), 1).await.unwrap();
        let second = orders.convert(user).await.unwrap();
        assert_eq!(first.cart_id, second.cart_id);
        assert_ne!(first.id, second.id);
        assert_eq!(second.total, Decimal::new(44_999, 2));
    }

    #[tokio::test]
    async fn test_orders_listing_expands_current_cart() {
        let (store, alice) = setup().await;
        let bob = store
            .create_user(&Username::parse("bob").unwrap(), "hash")
            .await
            .unwrap()
            .id;
        let carts = CartService::new(&store);
        let orders = OrderService::new(&store);

        carts.add_item(alice, ItemId::new(1), 1).await.unwrap();
        orders.convert(alice).await.unwrap();
        carts.add_item(bob, ItemId::new(2), 1).await.unwrap();
        orders.convert(bob).await.unwrap();

        let mine = orders.orders_for_user(alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, alice);
        let cart = mine[0].cart.as_ref().unwrap();
        assert!(cart.lines.is_empty());

        let all = orders.list_all_orders().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_conversion_is_all_or_nothing_against_concurrent_adds() {
        const ADDS: usize = 40;
        const CONVERTS: usize = 8;

        let (store, user) = setup().await;
        let store = Arc::new(store);
        let price = Decimal::new(29_999, 2);

        let adds: Vec<_> = (0..ADDS)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    CartService::new(&*store)
                        .add_item(user, ItemId::new(1), 1)
                        .await
                })
            })
            .collect();
        let converts: Vec<_> = (0..CONVERTS)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { OrderService::new(&*store).convert(user).await })
            })
            .collect();

        for handle in adds {
            handle.await.unwrap().unwrap();
        }
        let mut ordered = Decimal::ZERO;
        for handle in converts {
            match handle.await.unwrap() {
                Ok(order) => ordered += order.total,
                Err(OrderError::CartNotFound | OrderError::EmptyCart) => {}
                Err(e) => panic!("unexpected conversion failure: {e}"),
            }
        }

        let listed: Decimal = store
            .orders_for_user(user)
            .await
            .unwrap()
            .iter()
            .map(|o| o.total)
            .sum();
        assert_eq!(listed, ordered);

        let cart = store.get_cart(user).await.unwrap().unwrap();
        let remaining: Decimal = store
            .cart_lines(&[cart.id])
            .await
            .unwrap()
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity.get()))
            .sum();

        assert_eq!(ordered + remaining, price * Decimal::from(ADDS));
        assert_eq!(store.list_carts().await.unwrap().len(), 1);
    }
}

//! Administrative read-only listings across all users.

use std::collections::HashMap;

use thiserror::Error;

use super::cart::{CartError, CartService};
use super::orders::{OrderError, OrderService};
use crate::db::{RepositoryError, Store};
use crate::models::{CartView, OrderView, UserSummary};

/// Errors from directory listings.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Listings of users, carts and orders with owners attached.
///
/// Never exposes password hashes or session tokens.
pub struct DirectoryService<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> DirectoryService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All registered users.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Repository` if the query fails.
    pub async fn users(&self) -> Result<Vec<UserSummary>, DirectoryError> {
        let users = self.store.list_users().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// All carts, each with its lines and owner.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError` if a query or total fails.
    pub async fn carts(&self) -> Result<Vec<CartView>, DirectoryError> {
        let carts = CartService::new(self.store).list_all_carts().await?;
        let owners = self.owners().await?;

        Ok(carts
            .into_iter()
            .map(|cart| {
                let owner = owners.get(&cart.user_id).cloned();
                cart.with_user(owner)
            })
            .collect())
    }

    /// All orders, each with its source cart and owner.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError` if a query or total fails.
    pub async fn orders(&self) -> Result<Vec<OrderView>, DirectoryError> {
        let orders = OrderService::new(self.store).list_all_orders().await?;
        let owners = self.owners().await?;

        Ok(orders
            .into_iter()
            .map(|mut order| {
                order.user = owners.get(&order.user_id).cloned();
                order
            })
            .collect())
    }

    async fn owners(&self) -> Result<HashMap<cartline_core::UserId, UserSummary>, DirectoryError> {
        Ok(self
            .users()
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect())
    }
}

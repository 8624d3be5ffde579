//! In-process storage backend.
//!
//! All state lives behind one `tokio::sync::Mutex`, so every trait method is a
//! single critical section and the atomic operations are trivially atomic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use cartline_core::{
    CartEvent, CartId, CartLineId, CartStatus, ItemId, OrderId, OrderStatus, Quantity, UserId,
    Username, order_total,
};

use super::RepositoryError;
use super::store::{
    CartRepository, CatalogGateway, Conversion, LineRemoval, OrderRepository, Store,
    UserRepository,
};
use crate::models::cart::DEFAULT_CART_NAME;
use crate::models::{Cart, CartLine, Item, NewItem, Order, User};

#[derive(Debug)]
struct UserRecord {
    user: User,
    password_hash: String,
    token: Option<String>,
}

#[derive(Debug)]
struct ItemRecord {
    item: Item,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, UserRecord>,
    items: BTreeMap<ItemId, ItemRecord>,
    carts: BTreeMap<CartId, Cart>,
    lines: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    sequences: Sequences,
}

/// Last ID handed out per table, mirroring `SERIAL` columns.
#[derive(Debug, Default)]
struct Sequences {
    user: i32,
    item: i32,
    cart: i32,
    line: i32,
    order: i32,
}

const fn bump(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

impl Inner {
    fn cart_of(&self, user_id: UserId) -> Option<&Cart> {
        self.carts.values().find(|c| c.user_id == user_id)
    }

    fn insert_item(&mut self, new: &NewItem) -> Item {
        let now = Utc::now();
        let item = Item {
            id: ItemId::new(bump(&mut self.sequences.item)),
            name: new.name.clone(),
            description: new.description.clone(),
            price: new.price,
            category: new.category.clone(),
            rating: new.rating,
            reviews: new.reviews,
            image: new.image.clone(),
            in_stock: new.in_stock,
            created_at: now,
            updated_at: now,
        };
        self.items.insert(
            item.id,
            ItemRecord {
                item: item.clone(),
                deleted: false,
            },
        );
        item
    }

    fn live_item(&self, id: ItemId) -> Option<&Item> {
        self.items
            .get(&id)
            .filter(|r| !r.deleted)
            .map(|r| &r.item)
    }
}

/// Storage backend that keeps everything in memory.
///
/// Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose catalog holds `items`.
    #[must_use]
    pub fn with_items(items: &[NewItem]) -> Self {
        let mut inner = Inner::default();
        for item in items {
            inner.insert_item(item);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Change an item's catalog price in place.
    #[cfg(test)]
    pub(crate) async fn set_price(&self, id: ItemId, price: Decimal) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.items.get_mut(&id) {
            record.item.price = price;
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|r| &r.user.username == username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(bump(&mut inner.sequences.user)),
            username: username.clone(),
            cart_id: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
                token: None,
            },
        );
        Ok(user)
    }

    async fn get_credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|r| &r.user.username == username)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn get_with_token(
        &self,
        id: UserId,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .get(&id)
            .map(|r| (r.user.clone(), r.token.clone())))
    }

    async fn set_token(&self, id: UserId, token: &str) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let record = inner.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.token = Some(token.to_owned());
        record.user.updated_at = Utc::now();
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().map(|r| r.user.clone()).collect())
    }
}

#[async_trait]
impl CatalogGateway for MemoryStore {
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.live_item(id).cloned())
    }

    async fn get_items(&self, ids: &[ItemId]) -> Result<Vec<Item>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.live_item(*id).cloned())
            .collect())
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .items
            .values()
            .filter(|r| !r.deleted)
            .map(|r| r.item.clone())
            .collect())
    }

    async fn create_item(&self, item: &NewItem) -> Result<Item, RepositoryError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.insert_item(item))
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        match inner.items.get_mut(&id) {
            Some(record) if !record.deleted => {
                record.deleted = true;
                record.item.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_items(&self) -> Result<i64, RepositoryError> {
        let inner = self.inner.lock().await;
        let live = inner.items.values().filter(|r| !r.deleted).count();
        i64::try_from(live).map_err(|e| RepositoryError::OutOfRange(e.to_string()))
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.cart_of(user_id).cloned())
    }

    async fn get_carts(&self, ids: &[CartId]) -> Result<Vec<Cart>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.carts.get(id).cloned())
            .collect())
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.carts.values().cloned().collect())
    }

    async fn cart_lines(&self, cart_ids: &[CartId]) -> Result<Vec<CartLine>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .lines
            .values()
            .filter(|l| cart_ids.contains(&l.cart_id))
            .cloned()
            .collect())
    }

    async fn add_line(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: Quantity,
        unit_price: Decimal,
    ) -> Result<(Cart, CartLine), RepositoryError> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(RepositoryError::NotFound);
        }
        let now = Utc::now();

        // Compute the line change before touching anything so an overflow
        // leaves the store untouched.
        let existing_cart = inner.cart_of(user_id).map(|c| c.id);
        let existing_line = existing_cart.and_then(|cart_id| {
            inner
                .lines
                .values()
                .find(|l| l.cart_id == cart_id && l.item_id == item_id)
                .map(|l| (l.id, l.quantity))
        });
        let merged = match existing_line {
            Some((_, current)) => Some(current.checked_add(quantity).ok_or_else(|| {
                RepositoryError::OutOfRange(format!("quantity for item {item_id} overflows"))
            })?),
            None => None,
        };

        let cart_id = match existing_cart {
            Some(id) => id,
            None => {
                let cart = Cart {
                    id: CartId::new(bump(&mut inner.sequences.cart)),
                    user_id,
                    name: DEFAULT_CART_NAME.to_owned(),
                    status: CartStatus::Active,
                    created_at: now,
                    updated_at: now,
                };
                let id = cart.id;
                inner.carts.insert(id, cart);
                if let Some(record) = inner.users.get_mut(&user_id) {
                    record.user.cart_id = Some(id);
                    record.user.updated_at = now;
                }
                id
            }
        };

        let cart = inner
            .carts
            .get_mut(&cart_id)
            .ok_or(RepositoryError::NotFound)?;
        cart.status = cart
            .status
            .apply(CartEvent::ItemAdded)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        cart.updated_at = now;
        let cart = cart.clone();

        let line = match (existing_line, merged) {
            (Some((line_id, _)), Some(total)) => {
                let line = inner
                    .lines
                    .get_mut(&line_id)
                    .ok_or(RepositoryError::NotFound)?;
                line.quantity = total;
                line.updated_at = now;
                line.clone()
            }
            _ => {
                let line = CartLine {
                    id: CartLineId::new(bump(&mut inner.sequences.line)),
                    cart_id,
                    item_id,
                    quantity,
                    price: unit_price,
                    created_at: now,
                    updated_at: now,
                };
                inner.lines.insert(line.id, line.clone());
                line
            }
        };

        Ok((cart, line))
    }

    async fn remove_line(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<LineRemoval, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some(cart_id) = inner.cart_of(user_id).map(|c| c.id) else {
            return Ok(LineRemoval::NoCart);
        };

        let line_id = inner
            .lines
            .values()
            .find(|l| l.cart_id == cart_id && l.item_id == item_id)
            .map(|l| l.id);
        let Some(line_id) = line_id else {
            return Ok(LineRemoval::NotPresent);
        };
        inner.lines.remove(&line_id);

        if let Some(cart) = inner.carts.get_mut(&cart_id) {
            cart.status = cart
                .status
                .apply(CartEvent::ItemRemoved)
                .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
            cart.updated_at = Utc::now();
        }
        Ok(LineRemoval::Removed)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn convert_active_cart(&self, user_id: UserId) -> Result<Conversion, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let Some(cart) = inner.cart_of(user_id).cloned() else {
            return Ok(Conversion::NoCart);
        };

        let line_ids: Vec<CartLineId> = inner
            .lines
            .values()
            .filter(|l| l.cart_id == cart.id)
            .map(|l| l.id)
            .collect();
        if line_ids.is_empty() {
            return Ok(Conversion::EmptyCart(cart));
        }

        let total = order_total(
            inner
                .lines
                .values()
                .filter(|l| l.cart_id == cart.id)
                .map(|l| (l.price, l.quantity)),
        )
        .map_err(|e| RepositoryError::OutOfRange(e.to_string()))?;
        let next_status = cart
            .status
            .apply(CartEvent::Converted)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(bump(&mut inner.sequences.order)),
            cart_id: cart.id,
            user_id,
            total,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.orders.insert(order.id, order.clone());
        for id in &line_ids {
            inner.lines.remove(id);
        }

        let cart = Cart {
            status: next_status,
            updated_at: now,
            ..cart
        };
        inner.carts.insert(cart.id, cart.clone());

        Ok(Conversion::Converted { order, cart })
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.values().cloned().collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::catalog::default_catalog;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    async fn store_with_user() -> (MemoryStore, UserId) {
        let store = MemoryStore::with_items(&default_catalog());
        let user = store
            .create_user(&Username::parse("alice").unwrap(), "hash")
            .await
            .unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (store, _) = store_with_user().await;
        let err = store
            .create_user(&Username::parse("alice").unwrap(), "other")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let (_, hash) = store
            .get_credentials(&Username::parse("alice").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hash, "hash");
    }

    #[tokio::test]
    async fn test_add_line_creates_cart_and_binds_user() {
        let (store, user_id) = store_with_user().await;
        let item = store.list_items().await.unwrap()[0].clone();

        let (cart, line) = store
            .add_line(user_id, item.id, qty(2), item.price)
            .await
            .unwrap();
        assert_eq!(cart.user_id, user_id);
        assert_eq!(line.quantity.get(), 2);

        let (user, _) = store.get_with_token(user_id).await.unwrap().unwrap();
        assert_eq!(user.cart_id, Some(cart.id));
    }

    #[tokio::test]
    async fn test_add_line_merges_and_keeps_price() {
        let (store, user_id) = store_with_user().await;
        let item = store.list_items().await.unwrap()[0].clone();

        store
            .add_line(user_id, item.id, qty(2), item.price)
            .await
            .unwrap();
        let (cart, line) = store
            .add_line(user_id, item.id, qty(3), Decimal::ONE)
            .await
            .unwrap();
        assert_eq!(line.quantity.get(), 5);
        assert_eq!(line.price, item.price);
        assert_eq!(store.cart_lines(&[cart.id]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_line_overflow_leaves_line_unchanged() {
        let (store, user_id) = store_with_user().await;
        let item = store.list_items().await.unwrap()[0].clone();
        let max = qty(i64::from(i32::MAX));

        let (cart, _) = store
            .add_line(user_id, item.id, max, item.price)
            .await
            .unwrap();
        let err = store
            .add_line(user_id, item.id, qty(1), item.price)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::OutOfRange(_)));

        let lines = store.cart_lines(&[cart.id]).await.unwrap();
        assert_eq!(lines[0].quantity, max);
    }

    #[tokio::test]
    async fn test_remove_line_outcomes() {
        let (store, user_id) = store_with_user().await;
        let item = store.list_items().await.unwrap()[0].clone();

        assert_eq!(
            store.remove_line(user_id, item.id).await.unwrap(),
            LineRemoval::NoCart
        );

        store
            .add_line(user_id, item.id, qty(1), item.price)
            .await
            .unwrap();
        assert_eq!(
            store.remove_line(user_id, item.id).await.unwrap(),
            LineRemoval::Removed
        );
        assert_eq!(
            store.remove_line(user_id, item.id).await.unwrap(),
            LineRemoval::NotPresent
        );
    }

    #[tokio::test]
    async fn test_convert_empties_and_reuses_cart() {
        let (store, user_id) = store_with_user().await;
        let items = store.list_items().await.unwrap();

        assert_eq!(
            store.convert_active_cart(user_id).await.unwrap(),
            Conversion::NoCart
        );

        store
            .add_line(user_id, items[0].id, qty(2), items[0].price)
            .await
            .unwrap();
        store
            .add_line(user_id, items[3].id, qty(4), items[3].price)
            .await
            .unwrap();

        let Conversion::Converted { order, cart } =
            store.convert_active_cart(user_id).await.unwrap()
        else {
            panic!("expected conversion");
        };
        let expected = items[0].price * Decimal::from(2) + items[3].price * Decimal::from(4);
        assert_eq!(order.total, expected);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(cart.status, CartStatus::Converted);
        assert!(store.cart_lines(&[cart.id]).await.unwrap().is_empty());

        assert!(matches!(
            store.convert_active_cart(user_id).await.unwrap(),
            Conversion::EmptyCart(_)
        ));

        let (reused, _) = store
            .add_line(user_id, items[1].id, qty(1), items[1].price)
            .await
            .unwrap();
        assert_eq!(reused.id, cart.id);
        assert_eq!(reused.status, CartStatus::Active);
    }

    #[tokio::test]
    async fn test_deleted_items_are_hidden() {
        let (store, _) = store_with_user().await;
        let item = store.list_items().await.unwrap()[0].clone();

        assert!(store.delete_item(item.id).await.unwrap());
        assert!(!store.delete_item(item.id).await.unwrap());
        assert_eq!(store.get_item(item.id).await.unwrap(), None);
        assert!(store.get_items(&[item.id]).await.unwrap().is_empty());
        assert_eq!(store.count_items().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_set_token_unknown_user() {
        let store = MemoryStore::new();
        let err = store.set_token(UserId::new(42), "t").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}

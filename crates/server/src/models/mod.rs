//! Domain models for the cart service.
//!
//! These types are validated domain objects, separate from database row types
//! and from the HTTP request/response shapes in `routes`.

pub mod cart;
pub mod item;
pub mod order;
pub mod session;
pub mod user;
pub mod views;

pub use cart::{Cart, CartLine};
pub use item::{Item, NewItem};
pub use order::Order;
pub use session::CurrentUser;
pub use user::User;
pub use views::{CartLineView, CartView, ItemSummary, OrderView, UserSummary};

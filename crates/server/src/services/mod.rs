//! Business logic services.
//!
//! # Services
//!
//! - `session` - Signed, time-limited session tokens
//! - `auth` - Registration, login and token resolution
//! - `catalog` - Catalog management and seed data
//! - `cart` - Per-user cart with merge-on-add semantics
//! - `orders` - Atomic cart-to-order conversion
//! - `directory` - Administrative listings across users
//!
//! Services borrow the store they operate on; none of them hold global state.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod directory;
pub mod orders;
pub mod session;

pub use auth::{AuthError, AuthService, Login};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService, default_catalog};
pub use directory::{DirectoryError, DirectoryService};
pub use orders::{OrderError, OrderService};
pub use session::{SessionAuthority, SessionError};

//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                 - Service info and endpoint map
//! GET    /health           - Liveness check
//! GET    /health/ready     - Storage connectivity check
//!
//! # Users
//! POST   /users            - Register
//! POST   /users/login      - Login, returns a bearer token
//! GET    /users            - List users
//!
//! # Items
//! GET    /items            - List catalog
//! POST   /items            - Create item (requires auth)
//! DELETE /items/{id}       - Delete item (requires auth)
//!
//! # Carts (requires auth)
//! POST   /carts            - Add item to own cart
//! DELETE /carts            - Remove item from own cart
//! GET    /carts            - Own cart
//! GET    /carts/all        - Every cart
//!
//! # Orders (requires auth)
//! POST   /orders           - Convert own cart to an order
//! GET    /orders           - Own orders
//! GET    /orders/all       - Every order
//! ```

pub mod carts;
pub mod health;
pub mod items;
pub mod orders;
pub mod users;

use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Body of responses that only confirm an action.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/users", users::router())
        .nest("/items", items::router())
        .nest("/carts", carts::router())
        .nest("/orders", orders::router())
}

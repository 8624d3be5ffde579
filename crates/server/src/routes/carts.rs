//! Cart endpoints. Every route acts on the caller's own cart except `/all`.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cartline_core::ItemId;

use super::MessageResponse;
use crate::error::{ApiJson, Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::CartView;
use crate::services::{CartService, DirectoryService};
use crate::state::AppState;

/// Build the carts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show).post(add).delete(remove))
        .route("/all", get(list_all))
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_id: ItemId,
    /// Signed so that zero and negative values reach validation.
    pub quantity: i64,
}

/// Remove from cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub item_id: ItemId,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: CartView,
}

#[derive(Debug, Serialize)]
pub struct CartsResponse {
    pub carts: Vec<CartView>,
}

/// Add an item to the caller's cart, creating the cart if needed.
///
/// # Errors
///
/// Returns `InvalidArgument` if `quantity < 1` and `NotFound` if the item is
/// not in the catalog.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<Json<MessageResponse>> {
    CartService::new(state.store())
        .add_item(user.id, body.item_id, body.quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Item added",
        Some(&[("item_id", body.item_id.to_string().as_str())]),
    );

    Ok(Json(MessageResponse {
        message: "Item added to cart successfully",
    }))
}

/// Remove an item from the caller's cart.
///
/// # Errors
///
/// Returns `NotFound` if the caller has no cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RemoveItemRequest>,
) -> Result<Json<MessageResponse>> {
    CartService::new(state.store())
        .remove_item(user.id, body.item_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Item removed from cart successfully",
    }))
}

/// The caller's cart with expanded lines.
///
/// # Errors
///
/// Returns `NotFound` if the caller has no cart.
pub async fn show(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<CartResponse>> {
    let cart = CartService::new(state.store()).active_cart(user.id).await?;
    Ok(Json(CartResponse { cart }))
}

/// Every cart with its owner.
///
/// # Errors
///
/// Returns `Internal` if storage fails.
pub async fn list_all(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<CartsResponse>> {
    let carts = DirectoryService::new(state.store()).carts().await?;
    Ok(Json(CartsResponse { carts }))
}

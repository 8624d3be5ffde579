//! Order endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use cartline_core::OrderId;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::OrderView;
use crate::services::{DirectoryService, OrderService};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/all", get(list_all))
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderView>,
}

/// Convert the caller's cart into a pending order.
///
/// # Errors
///
/// Returns `NotFound` if the caller has no cart and `InvalidState` if it is
/// empty.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateOrderResponse>)> {
    let order = OrderService::new(state.store()).convert(user.id).await?;

    add_breadcrumb(
        "order",
        "Order created",
        Some(&[("order_id", order.id.to_string().as_str())]),
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            message: "Order created successfully",
            order_id: order.id,
            total: order.total,
        }),
    ))
}

/// The caller's orders.
///
/// # Errors
///
/// Returns `Internal` if storage fails.
pub async fn list(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<OrdersResponse>> {
    let orders = OrderService::new(state.store())
        .orders_for_user(user.id)
        .await?;
    Ok(Json(OrdersResponse { orders }))
}

/// Every order with its owner.
///
/// # Errors
///
/// Returns `Internal` if storage fails.
pub async fn list_all(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<OrdersResponse>> {
    let orders = DirectoryService::new(state.store()).orders().await?;
    Ok(Json(OrdersResponse { orders }))
}

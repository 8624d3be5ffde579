//! Catalog endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use serde::Serialize;
use tracing::instrument;

use cartline_core::ItemId;

use super::MessageResponse;
use crate::error::{ApiJson, ApiPath, Result};
use crate::middleware::RequireUser;
use crate::models::{Item, NewItem};
use crate::services::CatalogService;
use crate::state::AppState;

/// Build the items router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", delete(remove))
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
pub struct CreateItemResponse {
    pub message: &'static str,
    pub item: Item,
}

/// List live catalog items.
///
/// # Errors
///
/// Returns `Internal` if storage fails.
pub async fn list(State(state): State<AppState>) -> Result<Json<ItemsResponse>> {
    let items = CatalogService::new(state.store()).list().await?;
    Ok(Json(ItemsResponse { items }))
}

/// Create a catalog item.
///
/// # Errors
///
/// Returns `InvalidArgument` for an empty name or negative price.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewItem>,
) -> Result<(StatusCode, Json<CreateItemResponse>)> {
    let item = CatalogService::new(state.store()).create(body).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateItemResponse {
            message: "Item created successfully",
            item,
        }),
    ))
}

/// Delete a catalog item. Existing cart lines keep referencing it.
///
/// # Errors
///
/// Returns `InvalidArgument` for a non-numeric ID and `NotFound` if the item
/// does not exist.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ItemId>,
) -> Result<Json<MessageResponse>> {
    CatalogService::new(state.store()).delete(id).await?;

    Ok(Json(MessageResponse {
        message: "Item deleted successfully",
    }))
}

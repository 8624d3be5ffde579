//! Service info and health checks.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Build the info and health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(info))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Response for the service info endpoint.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub storage: &'static str,
    pub endpoints: Endpoints,
}

/// Endpoint map advertised at the root.
#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub users: &'static str,
    pub items: &'static str,
    pub carts: &'static str,
    pub orders: &'static str,
}

async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "cartline",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        storage: state.store().backend_name(),
        endpoints: Endpoints {
            users: "/users",
            items: "/items",
            carts: "/carts",
            orders: "/orders",
        },
    })
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

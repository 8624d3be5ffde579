//! Registration, login and the user listing.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cartline_core::UserId;

use crate::error::{ApiJson, Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::UserSummary;
use crate::services::{AuthService, DirectoryService};
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register).get(list))
        .route("/login", post(login))
}

/// Credentials for registration and login.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: UserId,
}

/// Response for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// Response for the user listing.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

/// Register a new user.
///
/// # Errors
///
/// Returns `InvalidArgument` for a malformed username or empty password and
/// `Conflict` if the username is taken.
#[instrument(skip_all, fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let user = AuthService::new(state.store(), state.sessions())
        .register(&body.username, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id: user.id,
        }),
    ))
}

/// Log in and receive a bearer token. Earlier tokens of the user stop working.
///
/// # Errors
///
/// Returns `Unauthenticated` if the username or password is wrong.
#[instrument(skip_all, fields(username = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CredentialsRequest>,
) -> Result<Json<LoginResponse>> {
    let login = AuthService::new(state.store(), state.sessions())
        .login(&body.username, &body.password, Utc::now())
        .await?;

    add_breadcrumb("auth", "User logged in", Some(&[("username", body.username.as_str())]));

    Ok(Json(LoginResponse {
        message: "Login successful",
        token: login.token,
        user_id: login.user.id,
        expires_at: login.expires_at,
    }))
}

/// List every registered user.
///
/// Only the identity fields are returned; hashes and tokens never leave
/// storage.
///
/// # Errors
///
/// Returns `Unauthenticated` without a valid token.
pub async fn list(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>> {
    let users = DirectoryService::new(state.store()).users().await?;
    Ok(Json(UsersResponse { users }))
}

//! Unified error handling with Sentry integration.
//!
//! Every failure reaching the HTTP boundary becomes an [`AppError`], which
//! carries a stable [`ErrorKind`] and renders as
//! `{"error": <message>, "kind": <kind>}`. Internal errors are captured to
//! Sentry and their details never reach the client.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{
    AuthError, CartError, CatalogError, DirectoryError, OrderError, SessionError,
};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Stable, caller-visible failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    Unauthenticated,
    NotFound,
    Conflict,
    InvalidState,
    Internal,
}

impl ErrorKind {
    /// HTTP status for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidArgument | Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Registration, login or token resolution failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Listing failed.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

type Classified = (ErrorKind, String);

fn internal() -> Classified {
    (ErrorKind::Internal, INTERNAL_MESSAGE.to_string())
}

fn classify_repository(err: &RepositoryError) -> Classified {
    match err {
        RepositoryError::NotFound => (ErrorKind::NotFound, "Not found".to_string()),
        RepositoryError::Conflict(msg) => (ErrorKind::Conflict, msg.clone()),
        RepositoryError::OutOfRange(_) => (
            ErrorKind::InvalidArgument,
            "Value out of range".to_string(),
        ),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

fn classify_auth(err: &AuthError) -> Classified {
    match err {
        AuthError::InvalidUsername(e) => (ErrorKind::InvalidArgument, capitalize(&e.to_string())),
        AuthError::EmptyPassword => (
            ErrorKind::InvalidArgument,
            "Password cannot be empty".to_string(),
        ),
        AuthError::InvalidCredentials => (
            ErrorKind::Unauthenticated,
            "Invalid username or password".to_string(),
        ),
        AuthError::UserAlreadyExists => (ErrorKind::Conflict, "Username already exists".to_string()),
        AuthError::Session(SessionError::Encode(_) | SessionError::InvalidKey) => internal(),
        AuthError::Session(_) => (
            ErrorKind::Unauthenticated,
            "Invalid or missing session token".to_string(),
        ),
        AuthError::Repository(_) | AuthError::PasswordHash => internal(),
    }
}

fn classify_cart(err: &CartError) -> Classified {
    match err {
        CartError::InvalidQuantity(e) => (ErrorKind::InvalidArgument, capitalize(&e.to_string())),
        CartError::QuantityOverflow(_) => (
            ErrorKind::InvalidArgument,
            "Quantity too large".to_string(),
        ),
        CartError::ItemNotFound => (ErrorKind::NotFound, "Item not found".to_string()),
        CartError::CartNotFound => (ErrorKind::NotFound, "Cart not found".to_string()),
        CartError::Pricing(_) | CartError::Repository(_) => internal(),
    }
}

fn classify_order(err: &OrderError) -> Classified {
    match err {
        OrderError::CartNotFound => (ErrorKind::NotFound, "Cart not found".to_string()),
        OrderError::EmptyCart => (ErrorKind::InvalidState, "Cart is empty".to_string()),
        OrderError::TotalOutOfRange(_) => (
            ErrorKind::InvalidArgument,
            "Order total out of range".to_string(),
        ),
        OrderError::Cart(e) => classify_cart(e),
        OrderError::Repository(_) => internal(),
    }
}

fn classify_catalog(err: &CatalogError) -> Classified {
    match err {
        CatalogError::Invalid(e) => (ErrorKind::InvalidArgument, capitalize(&e.to_string())),
        CatalogError::NotFound => (ErrorKind::NotFound, "Item not found".to_string()),
        CatalogError::Repository(e) => classify_repository(e),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl AppError {
    /// Kind and client-facing message.
    fn classify(&self) -> Classified {
        match self {
            Self::Database(e) => classify_repository(e),
            Self::Auth(e) => classify_auth(e),
            Self::Cart(e) => classify_cart(e),
            Self::Order(e) => classify_order(e),
            Self::Catalog(e) => classify_catalog(e),
            Self::Directory(e) => match e {
                DirectoryError::Cart(e) => classify_cart(e),
                DirectoryError::Order(e) => classify_order(e),
                DirectoryError::Repository(e) => classify_repository(e),
            },
            Self::Unauthorized(msg) => (ErrorKind::Unauthenticated, msg.clone()),
            Self::BadRequest(msg) => (ErrorKind::InvalidArgument, msg.clone()),
            Self::Internal(_) => internal(),
        }
    }

    /// The caller-visible kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.classify().0
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: ErrorKind,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (kind, message) = self.classify();

        // Capture server errors to Sentry
        if kind == ErrorKind::Internal {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, kind = ?kind, "Request rejected");
        }

        (
            kind.status(),
            Json(ErrorBody {
                error: message,
                kind,
            }),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON body extractor whose rejections render as `InvalidArgument`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Path parameter extractor whose rejections render as `InvalidArgument`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

//! Authentication error types.

use thiserror::Error;

use cartline_core::UsernameError;

use crate::db::RepositoryError;
use crate::services::session::SessionError;

/// Errors that can occur during registration, login or token resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// The password is empty.
    #[error("password cannot be empty")]
    EmptyPassword,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid username or password")]
    InvalidCredentials,

    /// User already exists.
    #[error("username already exists")]
    UserAlreadyExists,

    /// The presented session token was rejected.
    #[error("session rejected: {0}")]
    Session(#[from] SessionError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

//! Authentication service.
//!
//! Provides password registration and login, and resolves presented session
//! tokens to the current user. Only the most recently issued token of a user
//! is accepted.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use cartline_core::Username;

use super::session::{SessionAuthority, SessionError};
use crate::db::{RepositoryError, UserRepository};
use crate::models::{CurrentUser, User};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Login {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Handles user registration, login, and session token resolution.
pub struct AuthService<'a, S: UserRepository + ?Sized> {
    users: &'a S,
    sessions: &'a SessionAuthority,
}

impl<'a, S: UserRepository + ?Sized> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a S, sessions: &'a SessionAuthority) -> Self {
        Self { users, sessions }
    }

    /// Register a new user with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` if the username format is invalid.
    /// Returns `AuthError::EmptyPassword` if the password is empty.
    /// Returns `AuthError::UserAlreadyExists` if the username is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = Username::parse(username)?;
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_user(&username, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Login with username and password, issuing a session token valid from `now`.
    ///
    /// The token replaces any previously issued one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Login, AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let issued = self.sessions.issue(user.id, now)?;
        self.users.set_token(user.id, &issued.token).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(Login {
            user,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Resolve a presented token to the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the token fails verification, belongs to
    /// a user that no longer exists, or was replaced by a newer login.
    pub async fn authenticate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<CurrentUser, AuthError> {
        let claims = self.sessions.verify(token, now).inspect_err(|e| {
            debug!(cause = e.cause(), "Session token rejected");
        })?;

        let Some((user, current)) = self.users.get_with_token(claims.user_id).await? else {
            debug!(cause = SessionError::UnknownUser.cause(), user_id = %claims.user_id, "Session token rejected");
            return Err(SessionError::UnknownUser.into());
        };

        let is_current = current
            .as_deref()
            .is_some_and(|stored| constant_time_compare(stored, token.trim()));
        if !is_current {
            debug!(cause = SessionError::Superseded.cause(), user_id = %user.id, "Session token rejected");
            return Err(SessionError::Superseded.into());
        }

        Ok(CurrentUser {
            id: user.id,
            username: user.username,
        })
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryStore;

    fn sessions() -> SessionAuthority {
        SessionAuthority::new(&SecretString::from("auth-test-secret"), Duration::hours(1)).unwrap()
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let store = MemoryStore::new();
        let sessions = sessions();
        let auth = AuthService::new(&store, &sessions);

        assert!(matches!(
            auth.register("   ", "pw").await,
            Err(AuthError::InvalidUsername(_))
        ));
        assert!(matches!(
            auth.register("bob", "").await,
            Err(AuthError::EmptyPassword)
        ));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_register_keeps_original_password() {
        let store = MemoryStore::new();
        let sessions = sessions();
        let auth = AuthService::new(&store, &sessions);
        let now = Utc::now();

        auth.register("alice", "secret1").await.unwrap();
        assert!(matches!(
            auth.register("alice", "other").await,
            Err(AuthError::UserAlreadyExists)
        ));

        assert!(auth.login("alice", "secret1", now).await.is_ok());
        assert!(matches!(
            auth.login("alice", "other", now).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let store = MemoryStore::new();
        let sessions = sessions();
        let auth = AuthService::new(&store, &sessions);

        assert!(matches!(
            auth.login("ghost", "pw", Utc::now()).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_latest_login_wins() {
        let store = MemoryStore::new();
        let sessions = sessions();
        let auth = AuthService::new(&store, &sessions);
        let now = Utc::now();

        let user = auth.register("alice", "secret1").await.unwrap();
        let first = auth.login("alice", "secret1", now).await.unwrap();
        let current = auth.authenticate(&first.token, now).await.unwrap();
        assert_eq!(current.id, user.id);

        let later = now + Duration::seconds(1);
        let second = auth.login("alice", "secret1", later).await.unwrap();
        assert_ne!(first.token, second.token);

        assert!(matches!(
            auth.authenticate(&first.token, later).await,
            Err(AuthError::Session(SessionError::Superseded))
        ));
        assert!(auth.authenticate(&second.token, later).await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_expired_token() {
        let store = MemoryStore::new();
        let sessions = sessions();
        let auth = AuthService::new(&store, &sessions);
        let now = Utc::now();

        auth.register("alice", "secret1").await.unwrap();
        let login = auth.login("alice", "secret1", now).await.unwrap();

        assert!(matches!(
            auth.authenticate(&login.token, login.expires_at).await,
            Err(AuthError::Session(SessionError::Expired))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_unknown_user() {
        let store = MemoryStore::new();
        let sessions = sessions();
        let auth = AuthService::new(&store, &sessions);
        let now = Utc::now();

        let orphan = sessions.issue(cartline_core::UserId::new(99), now).unwrap();
        assert!(matches!(
            auth.authenticate(&orphan.token, now).await,
            Err(AuthError::Session(SessionError::UnknownUser))
        ));
    }
}

//! Session token issuing and verification.
//!
//! Tokens are HS256 JWTs (`jsonwebtoken`) whose claims carry the user ID, a
//! random token ID, and issue and expiry times in seconds since the epoch.
//! Expiry is checked against the caller's clock rather than the library's, so
//! verification is deterministic under test.
//! Verification is purely cryptographic; whether a token has been superseded by
//! a newer login is decided by the caller against the stored current token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use cartline_core::UserId;

/// Why a token was rejected or could not be produced.
///
/// Every rejection surfaces to callers as the same unauthenticated outcome;
/// the variant is only for logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No token was presented.
    #[error("missing session token")]
    Missing,
    /// The token is not a well-formed HS256 JWT.
    #[error("malformed session token")]
    Malformed,
    /// The MAC does not match.
    #[error("session token signature mismatch")]
    BadSignature,
    /// The token's expiry has passed.
    #[error("session token expired")]
    Expired,
    /// A newer login replaced this token.
    #[error("session token superseded by a newer login")]
    Superseded,
    /// The token's user no longer exists.
    #[error("session token refers to an unknown user")]
    UnknownUser,
    /// The signing key could not be used.
    #[error("invalid session signing key")]
    InvalidKey,
    /// The token could not be produced.
    #[error("failed to encode session token: {0}")]
    Encode(String),
}

impl SessionError {
    /// Short machine-readable cause for diagnostics.
    #[must_use]
    pub const fn cause(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::Superseded => "superseded",
            Self::UnknownUser => "unknown_user",
            Self::InvalidKey => "invalid_key",
            Self::Encode(_) => "encode",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            JwtErrorKind::InvalidSignature => Self::BadSignature,
            JwtErrorKind::ExpiredSignature => Self::Expired,
            JwtErrorKind::InvalidKeyFormat
            | JwtErrorKind::InvalidEcdsaKey
            | JwtErrorKind::InvalidRsaKey(_) => Self::InvalidKey,
            _ => Self::Malformed,
        }
    }
}

/// Payload of a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user.
    pub user_id: UserId,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expires at, seconds since the epoch. Invalid at and after this instant.
    pub exp: i64,
    /// Random token ID; two logins in the same second still differ.
    pub jti: Uuid,
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies signed, time-limited session tokens.
#[derive(Clone)]
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for SessionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthority")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionAuthority {
    /// Create an authority signing with `secret`; tokens live for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidKey`] if the secret is empty.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, SessionError> {
        let secret = secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(SessionError::InvalidKey);
        }

        // Expiry is compared against the injected clock in `verify`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id`, valid from `now` until `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encode`] if the expiry is not representable or
    /// the token cannot be signed.
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<IssuedToken, SessionError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| SessionError::Encode("expiry out of range".to_owned()))?;
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Encode(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check a token's signature and expiry at `now`.
    ///
    /// Does not consult storage.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] describing why the token was rejected.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::Missing);
        }

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?
            .claims;
        if now.timestamp() >= claims.exp {
            return Err(SessionError::Expired);
        }
        Ok(claims)
    }
}

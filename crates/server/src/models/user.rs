//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cartline_core::{CartId, UserId, Username};

/// A registered identity.
///
/// Never carries the password hash or the session token; repositories return
/// those separately to the few callers that need them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login handle, immutable after registration.
    pub username: Username,
    /// The user's cart, once one has been created.
    pub cart_id: Option<CartId>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the record last changed (login updates it).
    pub updated_at: DateTime<Utc>,
}

//! Authenticated caller identity.

use serde::Serialize;

use cartline_core::{UserId, Username};

/// Identity resolved from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's login handle.
    pub username: Username,
}

//! Lifecycle statuses for carts and orders.
//!
//! Statuses are persisted as lowercase text and parsed back with `FromStr`.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a user's cart.
///
/// Each user owns at most one cart row. It is never deleted: converting it
/// into an order empties it and marks it `Converted`, and the next item added
/// brings it back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Accepting additions and removals.
    #[default]
    Active,
    /// Emptied by an order conversion; reusable.
    Converted,
}

/// Something that happened to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartEvent {
    /// A line was inserted or its quantity increased.
    ItemAdded,
    /// A line was deleted (or the removal was a no-op).
    ItemRemoved,
    /// The cart's lines were snapshotted into an order and cleared.
    Converted,
}

/// A cart event is not allowed in the current state.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cart cannot go from {from} on {event:?}")]
pub struct TransitionError {
    /// State the cart was in.
    pub from: CartStatus,
    /// Rejected event.
    pub event: CartEvent,
}

impl CartStatus {
    /// Apply an event, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when converting a cart that has already
    /// been converted and not refilled.
    pub const fn apply(self, event: CartEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (_, CartEvent::ItemAdded) | (Self::Active, CartEvent::ItemRemoved) => {
                Ok(Self::Active)
            }
            (Self::Active, CartEvent::Converted) => Ok(Self::Converted),
            (Self::Converted, CartEvent::ItemRemoved) => Ok(Self::Converted),
            (Self::Converted, CartEvent::Converted) => Err(TransitionError {
                from: self,
                event,
            }),
        }
    }

    /// Text stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Converted => "converted",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "converted" => Ok(Self::Converted),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}

/// Order status.
///
/// Orders are created `Pending`; advancing them is outside this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
}

impl OrderStatus {
    /// Text stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adding_always_activates() {
        assert_eq!(
            CartStatus::Active.apply(CartEvent::ItemAdded),
            Ok(CartStatus::Active)
        );
        assert_eq!(
            CartStatus::Converted.apply(CartEvent::ItemAdded),
            Ok(CartStatus::Active)
        );
    }

    #[test]
    fn test_removal_keeps_state() {
        assert_eq!(
            CartStatus::Active.apply(CartEvent::ItemRemoved),
            Ok(CartStatus::Active)
        );
        assert_eq!(
            CartStatus::Converted.apply(CartEvent::ItemRemoved),
            Ok(CartStatus::Converted)
        );
    }

    #[test]
    fn test_double_conversion_rejected() {
        let converted = CartStatus::Active.apply(CartEvent::Converted);
        assert_eq!(converted, Ok(CartStatus::Converted));

        let err = CartStatus::Converted.apply(CartEvent::Converted);
        assert_eq!(
            err,
            Err(TransitionError {
                from: CartStatus::Converted,
                event: CartEvent::Converted,
            })
        );
    }

    #[test]
    fn test_status_text_roundtrip() {
        for status in [CartStatus::Active, CartStatus::Converted] {
            assert_eq!(status.as_str().parse::<CartStatus>(), Ok(status));
        }
        assert_eq!("pending".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}

//! Catalog item types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cartline_core::ItemId;

/// Prices are stored with this many decimal places.
pub const PRICE_SCALE: u32 = 2;

/// Largest price the `NUMERIC(12, 2)` column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// A catalog entry.
///
/// The cart service only reads `id` and `price`; the rest is display data
/// passed through to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub rating: f64,
    pub reviews: i32,
    pub image: String,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a catalog item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i32,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

/// A `NewItem` failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    #[error("item name cannot be empty")]
    EmptyName,
    #[error("item price cannot be negative")]
    NegativePrice,
    #[error("item price cannot exceed 9999999999.99")]
    PriceTooLarge,
    #[error("item review count cannot be negative")]
    NegativeReviews,
    #[error("item rating must be a finite number")]
    InvalidRating,
}

impl NewItem {
    /// Validate and normalize the input.
    ///
    /// Trims the name and rounds the price to [`PRICE_SCALE`] places so every
    /// storage backend holds the same value.
    ///
    /// # Errors
    ///
    /// Returns [`ItemValidationError`] describing the first invalid field.
    pub fn validate(mut self) -> Result<Self, ItemValidationError> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err(ItemValidationError::EmptyName);
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ItemValidationError::NegativePrice);
        }
        self.price = self.price.round_dp(PRICE_SCALE);
        if self.price > MAX_PRICE {
            return Err(ItemValidationError::PriceTooLarge);
        }
        if self.reviews < 0 {
            return Err(ItemValidationError::NegativeReviews);
        }
        if !self.rating.is_finite() {
            return Err(ItemValidationError::InvalidRating);
        }
        Ok(self)
    }
}

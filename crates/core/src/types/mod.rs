//! Core types for Cartline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod quantity;
pub mod status;
pub mod username;

pub use id::*;
pub use price::{PriceError, line_total, order_total};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
pub use username::{Username, UsernameError};

//! Decimal pricing for cart lines and orders.
//!
//! Prices are `rust_decimal::Decimal` amounts in the store currency. Lines carry
//! the unit price captured when they were first created, so order totals are
//! always computed from stored line prices, never from the live catalog.

use rust_decimal::Decimal;

use crate::Quantity;

/// Pricing arithmetic failed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// The amount exceeds the range `Decimal` can represent.
    #[error("price arithmetic overflowed")]
    Overflow,
}

/// Total for one line: `unit_price * quantity`.
///
/// # Errors
///
/// Returns [`PriceError::Overflow`] if the product is not representable.
pub fn line_total(unit_price: Decimal, quantity: Quantity) -> Result<Decimal, PriceError> {
    unit_price
        .checked_mul(Decimal::from(quantity.get()))
        .ok_or(PriceError::Overflow)
}

/// Sum of `unit_price * quantity` over all lines.
///
/// An empty iterator yields zero; callers decide whether an empty cart is
/// acceptable.
///
/// # Errors
///
/// Returns [`PriceError::Overflow`] if any product or the running sum is not
/// representable.
///
/// ```
/// use cartline_core::{Quantity, order_total};
/// use rust_decimal::Decimal;
///
/// let lines = [
///     (Decimal::new(1099, 2), Quantity::new(5).unwrap_or_else(|e| panic!("{e}"))),
///     (Decimal::new(250, 2), Quantity::new(2).unwrap_or_else(|e| panic!("{e}"))),
/// ];
/// assert_eq!(order_total(lines), Ok(Decimal::new(5995, 2)));
/// ```
pub fn order_total<I>(lines: I) -> Result<Decimal, PriceError>
where
    I: IntoIterator<Item = (Decimal, Quantity)>,
{
    lines
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, (price, quantity)| {
            acc.checked_add(line_total(price, quantity)?)
                .ok_or(PriceError::Overflow)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_line_total() {
        assert_eq!(
            line_total(Decimal::new(29999, 2), qty(3)),
            Ok(Decimal::new(89997, 2))
        );
    }

    #[test]
    fn test_order_total_empty_is_zero() {
        assert_eq!(order_total(std::iter::empty()), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_order_total_keeps_cents_exact() {
        // 0.10 * 3 must be exactly 0.30, not a binary float approximation
        let total = order_total([(Decimal::new(10, 2), qty(3))]);
        assert_eq!(total, Ok(Decimal::new(30, 2)));
    }

    #[test]
    fn test_order_total_overflow() {
        let total = order_total([(Decimal::MAX, qty(2))]);
        assert_eq!(total, Err(PriceError::Overflow));
    }
}

//! # Money Module
//!
//! Provides the `Money` type for prices, costs, subtotals and order totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  An order total is the sum of many line subtotals. With floats the     │
//! │  stored total drifts away from the sum of its lines.                   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    3 × 250 cents + 2 × 1099 cents = 2948 cents, exactly                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overflow
//! Arithmetic is checked and returns `None` instead of wrapping. Catalog
//! prices are capped at [`crate::MAX_PRICE_CENTS`] and line quantities at
//! [`crate::MAX_LINE_QUANTITY`], so a single subtotal always fits; only an
//! absurd number of lines could overflow a total.
//!
//! ## Usage
//! ```rust
//! use gestion_core::money::Money;
//!
//! let cost = Money::from_cents(250); // $2.50
//! let subtotal = cost.checked_mul_quantity(10).unwrap();
//! assert_eq!(subtotal.cents(), 2500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Every stored price, cost and total is non-negative; the signed
/// representation matches SQLite's INTEGER.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use gestion_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies a unit price by a line quantity.
    ///
    /// Widens to i128 for the product; `None` when the result does not fit.
    ///
    /// ## Example
    /// ```rust
    /// use gestion_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_mul_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_mul_quantity(3), None);
    /// ```
    #[inline]
    pub fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        let cents = self.0 as i128 * qty as i128;
        i64::try_from(cents).ok().map(Money)
    }

    /// Adds two amounts; `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering; report formatting belongs to the front end.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!(a.checked_add(b), Some(Money::from_cents(1500)));
        assert_eq!(a.checked_mul_quantity(3), Some(Money::from_cents(3000)));
        assert_eq!(Money::zero().checked_mul_quantity(99_999), Some(Money::zero()));
    }

    #[test]
    fn test_overflow_is_reported_not_wrapped() {
        let huge = Money::from_cents(i64::MAX / 2);

        assert_eq!(huge.checked_mul_quantity(3), None);
        assert_eq!(huge.checked_add(huge).map(|m| m.cents()), Some(i64::MAX - 1));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn test_largest_line_fits() {
        let subtotal = Money::from_cents(crate::MAX_PRICE_CENTS)
            .checked_mul_quantity(crate::MAX_LINE_QUANTITY)
            .unwrap();
        assert_eq!(subtotal.cents(), 9_999_999_999 * 99_999);
    }
}

//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    25000 × 0.11 = 2750.0000000000005                                   │
//! │    Summed over a day of sales, the drift shows up in the report.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + basis points                       │
//! │    25000 × 1100 bps = (25000 × 1100 + 5000) / 10000 = 2750             │
//! │    Every intermediate value is an exact integer                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_minor(25_000); // Rp25.000
//! let line = price.checked_multiply_quantity(2).unwrap();
//! assert_eq!(line.minor(), 50_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Serialized as a bare integer, so JSON payloads carry `11100` rather than
/// `"111.00"` or `111.0`.
///
/// ```text
/// Product.price ──► TransactionItem.price (snapshot) ──► item.subtotal
///                                                            │
///                              Σ item.subtotal ──► Transaction.subtotal
///                                                            │
///                              tax (11%, half-up) ──► Transaction.total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(10_000).minor(), 10_000);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax, rounding half up to a whole minor unit.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The `+5000` is the
    /// half-unit that turns truncation into half-up rounding. Computed in
    /// i128 so large day totals cannot overflow.
    ///
    /// ```rust
    /// use kasir_core::money::Money;
    /// use kasir_core::types::TaxRate;
    ///
    /// let rate = TaxRate::from_bps(1100);
    /// assert_eq!(Money::from_minor(10_000).calculate_tax(rate).minor(), 1_100);
    /// // 4.95 rounds up to 5
    /// assert_eq!(Money::from_minor(45).calculate_tax(rate).minor(), 5);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(tax as i64)
    }

    /// Multiplies a unit price by a quantity, `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Rupiah-style display with dot thousands separators: `Rp11.100`.
///
/// Debug and log output only; clients format amounts themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp{}", sign, grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(11_100).to_string(), "Rp11.100");
        assert_eq!(Money::from_minor(999).to_string(), "Rp999");
        assert_eq!(Money::from_minor(1_250_000).to_string(), "Rp1.250.000");
        assert_eq!(Money::from_minor(-25_000).to_string(), "-Rp25.000");
        assert_eq!(Money::zero().to_string(), "Rp0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);
    }

    #[test]
    fn test_tax_at_eleven_percent() {
        let rate = TaxRate::from_bps(1100);
        assert_eq!(Money::from_minor(10_000).calculate_tax(rate).minor(), 1_100);
        assert_eq!(Money::from_minor(25_000).calculate_tax(rate).minor(), 2_750);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        let rate = TaxRate::from_bps(1100);
        // 45 × 0.11 = 4.95 → 5
        assert_eq!(Money::from_minor(45).calculate_tax(rate).minor(), 5);
        // 44 × 0.11 = 4.84 → 5
        assert_eq!(Money::from_minor(44).calculate_tax(rate).minor(), 5);
        // 40 × 0.11 = 4.40 → 4
        assert_eq!(Money::from_minor(40).calculate_tax(rate).minor(), 4);
        // 50 × 0.11 = 5.50 → 6
        assert_eq!(Money::from_minor(50).calculate_tax(rate).minor(), 6);
    }

    #[test]
    fn test_tax_does_not_overflow_large_amounts() {
        let rate = TaxRate::from_bps(1100);
        let big = Money::from_minor(i64::MAX / 2);
        assert!(big.calculate_tax(rate).is_positive());
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_minor(25_000);
        assert_eq!(price.checked_multiply_quantity(3), Some(Money::from_minor(75_000)));
        assert_eq!(price.checked_add(price), Some(Money::from_minor(50_000)));

        let huge = Money::from_minor(i64::MAX / 2);
        assert_eq!(huge.checked_multiply_quantity(3), None);
        assert_eq!(huge.checked_add(huge).map(|m| m.minor()), Some(i64::MAX - 1));
        assert_eq!(huge.checked_add(Money::from_minor(i64::MAX / 2 + 2)), None);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650]
            .into_iter()
            .map(Money::from_minor)
            .sum();
        assert_eq!(total.minor(), 1000);
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_minor(11_100)).unwrap();
        assert_eq!(json, "11100");
    }
}

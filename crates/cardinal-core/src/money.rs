//! # Money Module
//!
//! Monetary values as integer cents.
//!
//! ## Why Integer Money?
//! Floating point cannot represent most decimal fractions exactly
//! (0.1 + 0.2 != 0.3), and tax reporting requires cent-exact totals.
//! Every monetary value in the engine is an `i64` count of cents; only
//! display code converts to dollars.
//!
//! ## Rounding Rule
//! Percentage tax is rounded half-up to the cent, ONCE, after multiplying
//! by the full line quantity. Per-unit rounding before the multiply can
//! drift from per-line rounding on large quantities, so the canonical
//! rule is "round after aggregating the line, never before"
//! (see [`Money::percentage_tax`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::types::TaxRate;

/// A monetary value in the smallest currency unit (cents for USD).
///
/// Signed so that refunds and credit adjustments downstream can reuse the
/// type, though the pricing engine itself never produces negative amounts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use cardinal_core::money::Money;
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
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a per-unit amount by a quantity.
    ///
    /// Exact in integer cents, so flat taxes (`tax_amount_cents * qty`)
    /// never need rounding.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes ad-valorem tax on this amount, rounded half-up to the cent.
    ///
    /// The rate is in basis points (1000 bps = 10%). Integer math over
    /// `i128` so large line totals cannot overflow:
    /// `(cents * bps + 5000) / 10000` — the +5000 is the half-up rounding
    /// term.
    ///
    /// ```rust
    /// use cardinal_core::money::Money;
    /// use cardinal_core::types::TaxRate;
    ///
    /// // $50.00 at 10% = $5.00
    /// let line = Money::from_cents(5000);
    /// assert_eq!(line.percentage_tax(TaxRate::from_bps(1000)).cents(), 500);
    ///
    /// // $10.00 at 8.25% = $0.825 -> rounds to $0.83
    /// let line = Money::from_cents(1000);
    /// assert_eq!(line.percentage_tax(TaxRate::from_bps(825)).cents(), 83);
    /// ```
    pub fn percentage_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }
}

/// Debug/log formatting as `$D.CC`. UI display formatting lives with the
/// consumers, not here.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let mut acc = Money::zero();
        acc += a;
        acc += b;
        assert_eq!(acc.cents(), 1500);
    }

    #[test]
    fn test_percentage_tax_exact() {
        // $50.00 at 10% = $5.00, no rounding needed
        let tax = Money::from_cents(5000).percentage_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 500);
    }

    #[test]
    fn test_percentage_tax_rounds_half_up() {
        // $10.00 at 8.25% = $0.825 -> $0.83
        let tax = Money::from_cents(1000).percentage_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);

        // $1.00 at 0.5% = $0.005 -> $0.01 (half rounds up)
        let tax = Money::from_cents(100).percentage_tax(TaxRate::from_bps(50));
        assert_eq!(tax.cents(), 1);
    }

    /// The per-line rounding rule: multiply by quantity first, round once.
    /// Per-unit rounding would give a different (wrong) answer here.
    #[test]
    fn test_round_after_line_aggregation_not_per_unit() {
        // Unit price $0.33, qty 100, rate 7.5%
        // Per line:  3300 * 750 / 10000 = 247.5 -> 248 cents
        // Per unit:  33 * 750 / 10000 = 2.475 -> 2 cents, x100 = 200 cents
        let unit = Money::from_cents(33);
        let rate = TaxRate::from_bps(750);

        let per_line = unit.multiply_quantity(100).percentage_tax(rate);
        assert_eq!(per_line.cents(), 248);

        let per_unit = Money::from_cents(unit.percentage_tax(rate).cents() * 100);
        assert_ne!(per_line, per_unit);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(60);
        assert_eq!(unit_price.multiply_quantity(5).cents(), 300);
    }

    #[test]
    fn test_zero_rate_yields_zero_tax() {
        let tax = Money::from_cents(123_456).percentage_tax(TaxRate::zero());
        assert_eq!(tax, Money::zero());
    }
}

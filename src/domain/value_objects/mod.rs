//! Value objects shared across the storefront domain.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money value object.
///
/// Single-currency (INR) decimal amount; multi-currency is out of scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Whole-rupee constructor, used by seed data and tests.
    pub fn rupees(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: Money) -> Money {
        Money(self.0 + other.0)
    }

    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }

    /// Percentage of this amount, rounded to the nearest minor unit
    /// (half away from zero).
    pub fn percent(&self, pct: u8) -> Money {
        let raw = self.0 * Decimal::from(pct) / Decimal::from(100u8);
        Money(raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        if other.0 >= self.0 {
            Money::zero()
        } else {
            Money(self.0 - other.0)
        }
    }

    pub fn min(&self, other: Money) -> Money {
        if self.0 <= other.0 {
            *self
        } else {
            other
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_add_multiply() {
        let a = Money::rupees(100);
        let b = Money::rupees(50);
        assert_eq!(a.add(b), Money::rupees(150));
        assert_eq!(b.multiply(3), Money::rupees(150));
    }

    #[test]
    fn test_percent_rounds_to_minor_unit() {
        assert_eq!(Money::rupees(1000).percent(10), Money::rupees(100));
        // 100.555 rounds half away from zero
        assert_eq!(
            Money::new(Decimal::new(100555, 2)).percent(10),
            Money::new(Decimal::new(10056, 2))
        );
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        assert_eq!(Money::rupees(100).saturating_sub(Money::rupees(30)), Money::rupees(70));
        assert_eq!(Money::rupees(100).saturating_sub(Money::rupees(500)), Money::zero());
    }
}

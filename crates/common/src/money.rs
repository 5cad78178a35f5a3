//! Integer money amounts.

use serde::{Deserialize, Serialize};

/// Money amount in the smallest currency unit.
///
/// Integer arithmetic only; discounts are floored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new amount.
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw amount.
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Multiplies by a quantity, clamping at the `i64` bounds.
    pub fn saturating_multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Adds two amounts, clamping at the `i64` bounds.
    pub fn saturating_add(&self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }

    /// Reduces the amount by `percent` (clamped to 0..=100), rounding down.
    pub fn discounted(&self, percent: u8) -> Money {
        let percent = i128::from(percent.min(100));
        // |result| <= |self|, so the narrowing cannot fail.
        let amount = i128::from(self.0) * (100 - percent) / 100;
        Money(i64::try_from(amount).unwrap_or(self.0))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_by_quantity() {
        assert_eq!(Money::new(500).checked_multiply(2), Some(Money::new(1000)));
        assert_eq!(Money::new(500).checked_multiply(0), Some(Money::zero()));
        assert_eq!(Money::new(i64::MAX / 2).checked_multiply(3), None);
        assert_eq!(
            Money::new(i64::MAX / 2).saturating_multiply(3),
            Money::new(i64::MAX)
        );
    }

    #[test]
    fn discount_floors_result() {
        assert_eq!(Money::new(1300).discounted(10), Money::new(1170));
        assert_eq!(Money::new(999).discounted(15), Money::new(849));
        assert_eq!(Money::new(1).discounted(50), Money::zero());
    }

    #[test]
    fn discount_of_large_amounts() {
        let amount = Money::new(4_000_000_000_000_000_000);
        assert_eq!(amount.discounted(50), Money::new(2_000_000_000_000_000_000));
        assert_eq!(Money::new(i64::MAX).discounted(0), Money::new(i64::MAX));
    }

    #[test]
    fn discount_bounds() {
        assert_eq!(Money::new(1300).discounted(0), Money::new(1300));
        assert_eq!(Money::new(1300).discounted(100), Money::zero());
        assert_eq!(Money::new(1300).discounted(250), Money::zero());
    }

    #[test]
    fn checked_addition() {
        assert_eq!(
            Money::new(1000).checked_add(Money::new(300)),
            Some(Money::new(1300))
        );
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);
        assert_eq!(
            Money::new(i64::MAX).saturating_add(Money::new(1)),
            Money::new(i64::MAX)
        );

        let money = Money::new(100).saturating_add(Money::new(50));
        assert_eq!(money.amount(), 150);
        assert!(!money.is_zero());
        assert!(!money.is_negative());
    }
}

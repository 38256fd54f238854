//! Yen amounts using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in Japanese yen.
///
/// Unit prices may carry fractional yen; display rounds half away from zero
/// to whole yen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero yen.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole yen.
    #[must_use]
    pub fn from_yen(yen: i64) -> Self {
        Self(Decimal::from(yen))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Total for `quantity` units at `unit_price`.
    #[must_use]
    pub fn line_total(unit_price: Decimal, quantity: i32) -> Self {
        Self(unit_price * Decimal::from(quantity))
    }

    /// Whole yen, rounded half away from zero.
    #[must_use]
    pub fn whole_yen(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.whole_yen();
        let Some(yen) = whole.to_i64() else {
            return write!(f, "¥{whole}");
        };

        let digits = yen.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        if yen < 0 {
            write!(f, "-¥{grouped}")
        } else {
            write!(f, "¥{grouped}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_yen(0).to_string(), "¥0");
        assert_eq!(Money::from_yen(999).to_string(), "¥999");
        assert_eq!(Money::from_yen(1_000).to_string(), "¥1,000");
        assert_eq!(Money::from_yen(1_234_567).to_string(), "¥1,234,567");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(Money::from_yen(-12_500).to_string(), "-¥12,500");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        assert_eq!(Money::new(Decimal::new(10_050, 2)).to_string(), "¥101");
        assert_eq!(Money::new(Decimal::new(10_049, 2)).to_string(), "¥100");
    }

    #[test]
    fn test_line_total() {
        let total = Money::line_total(Decimal::new(1_250, 1), 4);
        assert_eq!(total, Money::from_yen(500));
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_yen(100), Money::from_yen(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_yen(350));
    }
}

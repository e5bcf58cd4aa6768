//! Monetary amounts.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Money`] amount from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input string is empty.
    #[error("price is required")]
    Empty,
    /// The input is not a decimal number.
    #[error("enter a number")]
    Invalid,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two fractional digits.
    #[error("price can have at most 2 decimal places")]
    TooPrecise,
    /// The amount does not fit in integer cents.
    #[error("price is too large")]
    Overflow,
}

/// A non-negative amount of money in the store currency.
///
/// Backed by a [`Decimal`] so arithmetic is exact; amounts are only rounded
/// to cents, half away from zero, when formatted. Persisted as integer cents.
///
/// ```
/// use bazaar_core::Money;
///
/// let price = Money::parse("19.99").unwrap();
/// assert_eq!(price.cents(), 1999);
/// assert_eq!((price * 2).to_string(), "$39.98");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build an amount from integer cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Parse a user-supplied price such as `"10"`, `"10.5"` or `"10.50"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, negative, has
    /// more than two fractional digits, or overflows integer cents.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyError::Empty);
        }

        let amount: Decimal = s.parse().map_err(|_| MoneyError::Invalid)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(MoneyError::TooPrecise);
        }

        let money = Self(amount);
        money
            .try_cents()
            .ok_or(MoneyError::Overflow)
            .map(|_| money)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount rounded to whole cents.
    ///
    /// Saturates at `i64::MAX` for amounts that cannot be represented.
    #[must_use]
    pub fn cents(&self) -> i64 {
        self.try_cents().unwrap_or(i64::MAX)
    }

    fn try_cents(&self) -> Option<i64> {
        (self.rounded() * Decimal::ONE_HUNDRED).to_i64()
    }

    fn rounded(&self) -> Decimal {
        self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// The amount formatted to two decimal places without a currency symbol.
    ///
    /// Used for CSV export and form pre-fill.
    #[must_use]
    pub fn plain(&self) -> String {
        format!("{:.2}", self.rounded())
    }

    /// Multiply by a percentage, e.g. `percent(13)` for 13% tax.
    #[must_use]
    pub fn percent(&self, pct: u32) -> Self {
        Self(self.0 * Decimal::new(i64::from(pct), 2))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.plain())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_prices() {
        assert_eq!(Money::parse("10").unwrap().cents(), 1000);
        assert_eq!(Money::parse("10.5").unwrap().cents(), 1050);
        assert_eq!(Money::parse(" 0.99 ").unwrap().cents(), 99);
        assert_eq!(Money::parse("0").unwrap(), Money::ZERO);
        assert_eq!(Money::parse("12.50").unwrap().cents(), 1250);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Money::parse(""), Err(MoneyError::Empty));
        assert_eq!(Money::parse("ten"), Err(MoneyError::Invalid));
        assert_eq!(Money::parse("-1"), Err(MoneyError::Negative));
        assert_eq!(Money::parse("1.999"), Err(MoneyError::TooPrecise));
    }

    #[test]
    fn test_parse_allows_trailing_zeros() {
        assert_eq!(Money::parse("1.5000").unwrap().cents(), 150);
    }

    #[test]
    fn test_display_rounds_to_cents() {
        assert_eq!(Money::from_cents(1000).to_string(), "$10.00");
        assert_eq!(Money::new(Decimal::new(1_3455, 4)).to_string(), "$1.35");
    }

    #[test]
    fn test_half_cent_rounds_up() {
        let tax = Money::from_cents(50).percent(13);
        assert_eq!(tax.amount(), Decimal::new(65, 3));
        assert_eq!(tax.to_string(), "$0.07");
        assert_eq!(tax.cents(), 7);
        assert_eq!(Money::new(Decimal::new(1_125, 3)).plain(), "1.13");
    }

    #[test]
    fn test_percent() {
        let tax = Money::from_cents(3000).percent(13);
        assert_eq!(tax.amount(), Decimal::new(390, 2));
    }

    #[test]
    fn test_sum_and_mul() {
        let total: Money = [Money::from_cents(250), Money::from_cents(100) * 3]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 550);
    }
}

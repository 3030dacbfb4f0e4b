//! Money type with precise decimal arithmetic
//!
//! Fees are assessed and settled in a single national currency, so `Money`
//! carries no currency tag. Every value is held at two decimal places and
//! rounded half-up (midpoint away from zero) on construction.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use thiserror::Error;

/// Number of decimal places every monetary amount is kept at
pub const MONEY_SCALE: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// Rounds `value` to `dp` decimal places, half-up
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary amount with two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Creates a new Money value, rounding half-up to two decimals
    pub fn new(amount: Decimal) -> Self {
        let mut rounded = round_half_up(amount, MONEY_SCALE);
        rounded.rescale(MONEY_SCALE);
        Self(rounded)
    }

    /// Creates a strictly positive amount
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidAmount` when the rounded value is zero or negative
    pub fn positive(amount: Decimal) -> Result<Self, MoneyError> {
        let money = Self::new(amount);
        if !money.is_positive() {
            return Err(MoneyError::InvalidAmount(format!(
                "amount must be greater than zero, got {}",
                amount
            )));
        }
        Ok(money)
    }

    /// Creates Money from an integer amount in minor units (tyiyn)
    pub fn from_minor(minor_units: i64) -> Self {
        Self::new(Decimal::new(minor_units, MONEY_SCALE))
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Checked addition that reports overflow instead of panicking
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction that reports overflow instead of panicking
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Sums amounts, failing with `Overflow` instead of panicking
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Result<Money, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(&m))
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, factor: Decimal) -> Self {
        Self::new(self.0 * factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounds_half_up() {
        assert_eq!(Money::new(dec!(10.005)).amount(), dec!(10.01));
        assert_eq!(Money::new(dec!(10.004)).amount(), dec!(10.00));
        assert_eq!(Money::new(dec!(-10.005)).amount(), dec!(-10.01));
    }

    #[test]
    fn test_money_keeps_two_decimal_scale() {
        assert_eq!(Money::new(dec!(800)).to_string(), "800.00");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_positive_rejects_zero_and_negative() {
        assert!(Money::positive(dec!(0)).is_err());
        assert!(Money::positive(dec!(-1)).is_err());
        assert!(Money::positive(dec!(0.004)).is_err());
        assert_eq!(Money::positive(dec!(0.01)).unwrap().amount(), dec!(0.01));
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(100.00));
        let b = Money::new(dec!(50.25));

        assert_eq!((a + b).amount(), dec!(150.25));
        assert_eq!((a - b).amount(), dec!(49.75));
        assert_eq!((-a).amount(), dec!(-100.00));
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        let total = Money::checked_sum([Money::new(dec!(100.10)), Money::new(dec!(0.15))]).unwrap();
        assert_eq!(total.amount(), dec!(100.25));
        assert!(Money::checked_sum(Vec::<Money>::new()).unwrap().is_zero());

        let huge = Money::new(dec!(50_000_000_000_000_000_000_000_000_000));
        assert_eq!(Money::checked_sum([huge, huge]), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_money_serde_roundtrips_through_decimal() {
        let json = serde_json::to_string(&Money::new(dec!(800))).unwrap();
        assert_eq!(json, "\"800.00\"");

        let parsed: Money = serde_json::from_str("\"12.345\"").unwrap();
        assert_eq!(parsed.amount(), dec!(12.35));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn money_sum_matches_decimal_sum(amounts in prop::collection::vec(-1_000_000_000i64..1_000_000_000i64, 0..50)) {
            let total: Money = amounts.iter().map(|m| Money::from_minor(*m)).sum();
            let expected: Decimal = amounts.iter().map(|m| Decimal::new(*m, 2)).sum();
            prop_assert_eq!(total.amount(), expected);
        }

        #[test]
        fn money_arithmetic_is_associative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64,
            c in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a);
            let mb = Money::from_minor(b);
            let mc = Money::from_minor(c);

            prop_assert_eq!((ma + mb) + mc, ma + (mb + mc));
        }
    }
}

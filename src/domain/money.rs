use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A monetary amount in the restaurant's currency.
///
/// Wraps `rust_decimal::Decimal` so prices, line totals and tax never pass
/// through binary floating point. Serialized as a JSON number for the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] pub Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Rounds to whole cents, half away from zero.
    pub fn round_cents(self) -> Self {
        Self(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Tax owed on this amount at `rate` (0.08 for 8%), rounded to cents.
    pub fn tax(self, rate: Decimal) -> Self {
        Self(self.0 * rate).round_cents()
    }

    pub fn with_tax(self, rate: Decimal) -> Self {
        (self + self.tax(rate)).round_cents()
    }

    /// Plain two-decimal rendering without the currency sign, as used in CSV output.
    pub fn to_plain(&self) -> String {
        format!("{:.2}", self.round_cents().0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            write!(f, "-${}", Money(-self.0).to_plain())
        } else {
            write!(f, "${}", self.to_plain())
        }
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Mul<u32> for Money {
    type Output = Self;
    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(8.00));
        let b = Money::new(dec!(3.00));
        assert_eq!(a * 2 + b, Money::new(dec!(19.00)));
        assert_eq!(a - b, Money::new(dec!(5.00)));
        assert_eq!(vec![a, b].into_iter().sum::<Money>(), Money::new(dec!(11.00)));
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        let subtotal = Money::new(dec!(19.00));
        assert_eq!(subtotal.tax(dec!(0.08)), Money::new(dec!(1.52)));
        assert_eq!(subtotal.with_tax(dec!(0.08)), Money::new(dec!(20.52)));

        // 0.125 rounds half away from zero
        assert_eq!(Money::new(dec!(1.5625)).tax(dec!(0.08)), Money::new(dec!(0.13)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(dec!(20.52)).to_string(), "$20.52");
        assert_eq!(Money::new(dec!(3)).to_string(), "$3.00");
        assert_eq!(Money::new(dec!(-1.5)).to_string(), "-$1.50");
    }

    #[test]
    fn test_json_is_a_number() {
        let json = serde_json::to_value(Money::new(dec!(8.5))).unwrap();
        assert_eq!(json, serde_json::json!(8.5));

        let parsed: Money = serde_json::from_str("12.99").unwrap();
        assert_eq!(parsed, Money::new(dec!(12.99)));
    }
}

//! Money value object.
//!
//! Amounts are held in the smallest currency unit, which for the receivables
//! back office is the whole dong (VND has no minor unit). Storage collaborators
//! already store amounts in that unit and hand them over in several shapes: a
//! raw number, a numeric string, an `{ "amount": .., "formatted": .. }` wrapper,
//! or `null`. All of them are normalized here, at the boundary, so the business
//! rules only ever see `Money`.
//!
//! Incoming values are never scaled by a currency exponent. A fractional part
//! is a fraction of the smallest unit and is rounded to the nearest unit.

use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Deserializer, Serialize};

use crate::value_object::ValueObject;

/// Non-negative whole amount in the smallest currency unit (whole dong).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(minor_units: u64) -> Self {
        Self(minor_units)
    }

    /// Build from a signed amount, clamping negatives to zero.
    pub fn from_signed(minor_units: i64) -> Self {
        Self(u64::try_from(minor_units).unwrap_or(0))
    }

    /// Build from a floating point amount (rounded), clamping negatives and
    /// non-finite values to zero.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Self::ZERO;
        }
        // `as` saturates at u64::MAX.
        Self(value.round() as u64)
    }

    pub const fn amount(&self) -> u64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for Money {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Money;

    /// Saturating: aggregated exposure never wraps.
    fn add(self, rhs: Money) -> Money {
        self.saturating_add(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

/// Every shape an amount can arrive in from a storage collaborator.
#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Wrapped { amount: Option<Box<MoneyRepr>> },
}

impl MoneyRepr {
    fn normalize(self) -> Money {
        match self {
            MoneyRepr::Unsigned(v) => Money::new(v),
            MoneyRepr::Signed(v) => Money::from_signed(v),
            MoneyRepr::Float(v) => Money::from_f64(v),
            MoneyRepr::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Money::from_f64)
                .unwrap_or(Money::ZERO),
            MoneyRepr::Wrapped { amount } => amount.map(|a| a.normalize()).unwrap_or(Money::ZERO),
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = Option::<MoneyRepr>::deserialize(deserializer)?;
        Ok(repr.map(MoneyRepr::normalize).unwrap_or(Money::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(json: &str) -> Money {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_raw_number() {
        assert_eq!(parse("50000000"), Money::new(50_000_000));
    }

    #[test]
    fn accepts_amount_wrapper() {
        assert_eq!(
            parse(r#"{"amount": 50000000, "formatted": "50.000.000 ₫"}"#),
            Money::new(50_000_000)
        );
    }

    #[test]
    fn fractions_of_a_unit_round_without_scaling() {
        assert_eq!(parse(r#""1250.4""#), Money::new(1250));
        assert_eq!(parse("1250.6"), Money::new(1251));
        assert_eq!(parse(r#"{"amount": "99.5"}"#), Money::new(100));
        // Same unit whatever the shape: no exponent is applied.
        assert_eq!(parse(r#""20000000""#), parse("20000000"));
        assert_eq!(parse("20000000.0"), Money::new(20_000_000));
    }

    #[test]
    fn missing_or_malformed_amounts_become_zero() {
        assert_eq!(parse("null"), Money::ZERO);
        assert_eq!(parse(r#"{"formatted": "n/a"}"#), Money::ZERO);
        assert_eq!(parse(r#""abc""#), Money::ZERO);
    }

    #[test]
    fn negative_amounts_clamp_to_zero() {
        assert_eq!(parse("-300"), Money::ZERO);
        assert_eq!(parse("-0.5"), Money::ZERO);
        assert_eq!(Money::from_signed(-1), Money::ZERO);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn sum_saturates() {
        let total: Money = [Money::new(u64::MAX), Money::new(1)].iter().sum();
        assert_eq!(total, Money::new(u64::MAX));
    }

    proptest! {
        #[test]
        fn wrapper_and_raw_shapes_agree(amount in 0u64..1_000_000_000_000u64) {
            let raw: Money = serde_json::from_str(&amount.to_string()).unwrap();
            let wrapped: Money =
                serde_json::from_str(&format!(r#"{{"amount": {amount}}}"#)).unwrap();
            prop_assert_eq!(raw, wrapped);
            prop_assert_eq!(raw.amount(), amount);
        }
    }
}

use std::{fmt::Display, iter::Sum, ops::Add, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount in cents. Stored in the database as a plain integer.
///
/// Two decimal places of precision is all the ledger ever records, so an `i64` cent count avoids every floating-point
/// rounding trap while staying directly comparable and summable.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a decimal amount with up to two decimal places, e.g. `"12.50"`, `"0.05"` or `"100"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if frac.len() > 2 {
            return Err(MoneyConversionError(format!("More than two decimal places in '{s}'")));
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|e| MoneyConversionError(e.to_string()))? };
        let mut cents = if frac.is_empty() { 0 } else { frac.parse::<i64>().map_err(|e| MoneyConversionError(e.to_string()))? };
        if frac.len() == 1 {
            cents *= 10;
        }
        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .and_then(|v| v.checked_mul(sign))
            .map(Self)
            .ok_or_else(|| MoneyConversionError(format!("'{s}' overflows the representable range")))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Constructs an amount from whole currency units.
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::Money;

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(1_050);
        let b = Money::from_major(2);
        assert_eq!(a + b, Money::from_cents(1_250));
        assert_eq!(a - b, Money::from_cents(850));
        assert_eq!(-a, Money::from_cents(-1_050));
        let mut c = a;
        c -= b;
        assert_eq!(c, Money::from_cents(850));
        assert_eq!(vec![a, b].into_iter().sum::<Money>(), Money::from_cents(1_250));
    }

    #[test]
    fn display() {
        assert_eq!(Money::from_cents(1_050).to_string(), "10.50");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-325).to_string(), "-3.25");
        assert_eq!(Money::default().to_string(), "0.00");
    }

    #[test]
    fn parsing() {
        assert_eq!("12.50".parse::<Money>().unwrap(), Money::from_cents(1_250));
        assert_eq!("100".parse::<Money>().unwrap(), Money::from_major(100));
        assert_eq!("0.5".parse::<Money>().unwrap(), Money::from_cents(50));
        assert_eq!("-3.25".parse::<Money>().unwrap(), Money::from_cents(-325));
        assert!("1.999".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn ordering_and_sign() {
        assert!(Money::from_cents(100) > Money::from_cents(99));
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::from_cents(0).is_negative());
        assert!(Money::from_cents(0).is_zero());
    }
}

//! Money type for the payment and deposit columns.
//!
//! A `Money` value is either empty (the column left blank) or a non-negative decimal with
//! at most two fractional digits. Whatever precision was typed in, the value is written
//! back out normalized to two decimal places, so `10` round-trips as `10.00`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error as StdError;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// An optional, non-negative dollar amount.
///
/// # Examples
///
/// Empty input stays empty:
/// ```
/// # use sheetbook::model::Money;
/// # use std::str::FromStr;
/// let money = Money::from_str("").unwrap();
/// assert!(money.is_empty());
/// assert_eq!(money.to_string(), "");
/// ```
///
/// Whole-dollar input normalizes to two places:
/// ```
/// # use sheetbook::model::Money;
/// # use std::str::FromStr;
/// let money = Money::from_str("10").unwrap();
/// assert_eq!(money.to_string(), "10.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Option<Decimal>);

impl Money {
    /// An empty (blank-column) amount.
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Wraps a non-negative decimal. Returns a `MoneyError` for negative input or more
    /// than two fractional digits.
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        validate(value)?;
        Ok(Self(Some(value)))
    }

    /// True when the column is blank.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// The numeric value, treating an empty column as zero. This is the value used in all
    /// balance arithmetic.
    pub fn value(&self) -> Decimal {
        self.0.unwrap_or_default()
    }
}

/// An error produced when a string cannot be read as a money amount.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MoneyError(String);

impl Display for MoneyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for MoneyError {}

impl From<MoneyError> for crate::Error {
    fn from(e: MoneyError) -> Self {
        crate::Error::Validation(e.0)
    }
}

fn validate(value: Decimal) -> Result<(), MoneyError> {
    if value.is_sign_negative() {
        return Err(MoneyError(format!(
            "A money amount must not be negative, got '{value}'"
        )));
    }
    if value.scale() > 2 {
        return Err(MoneyError(format!(
            "A money amount must have at most two decimal places, got '{value}'"
        )));
    }
    Ok(())
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Money::empty());
        }
        let value = Decimal::from_str(trimmed)
            .map_err(|_| MoneyError(format!("Not a valid dollar amount: '{trimmed}'")))?;
        validate(value)?;
        Ok(Self(Some(value)))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => Ok(()),
            Some(value) => write!(f, "{value:.2}"),
        }
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}

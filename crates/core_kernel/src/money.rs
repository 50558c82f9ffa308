//! Money types with precise decimal arithmetic
//!
//! Premiums and sums insured are carried as `Money` so that totals on the
//! dashboard and figures quoted in reminder messages never pass through
//! floating point.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    AED,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::AED => "AED ",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "AED" => Ok(Currency::AED),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// A monetary amount with associated currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value, rounded to the currency's minor unit
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(currency.decimal_places()),
            currency,
        }
    }

    /// Creates an INR amount
    pub fn inr(amount: Decimal) -> Self {
        Self::new(amount, Currency::INR)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Multiplies by a scalar (e.g. a premium frequency factor)
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }

    /// Sums amounts of a single currency, starting from zero
    pub fn sum<'a>(
        currency: Currency,
        amounts: impl IntoIterator<Item = &'a Money>,
    ) -> Result<Money, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    /// Formats the amount with its symbol and digit grouping for messages
    ///
    /// INR uses the lakh/crore grouping (`₹1,25,000.00`); every other
    /// currency groups by thousands.
    pub fn to_display_string(&self) -> String {
        let dp = self.currency.decimal_places() as usize;
        let fixed = format!("{:.dp$}", self.amount.abs(), dp = dp);
        let (whole, fraction) = match fixed.split_once('.') {
            Some((w, f)) => (w.to_string(), Some(f.to_string())),
            None => (fixed, None),
        };

        let grouped = if self.currency == Currency::INR {
            group_indian(&whole)
        } else {
            group_thousands(&whole)
        };

        let sign = if self.amount.is_sign_negative() && !self.amount.is_zero() { "-" } else { "" };
        match fraction {
            Some(f) => format!("{}{}{}.{}", sign, self.currency.symbol(), grouped, f),
            None => format!("{}{}{}", sign, self.currency.symbol(), grouped),
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut out = String::new();
    for (i, ch) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(tail);
    out
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.code(),
            self.amount,
            dp = dp as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_minor_unit() {
        let m = Money::inr(dec!(100.456));
        assert_eq!(m.amount(), dec!(100.46));
    }

    #[test]
    fn test_checked_add_rejects_mismatch() {
        let a = Money::inr(dec!(10));
        let b = Money::new(dec!(10), Currency::USD);
        assert!(matches!(a.checked_add(&b), Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_indian_grouping() {
        assert_eq!(Money::inr(dec!(125000)).to_display_string(), "₹1,25,000.00");
        assert_eq!(Money::inr(dec!(12345678.5)).to_display_string(), "₹1,23,45,678.50");
        assert_eq!(Money::inr(dec!(999)).to_display_string(), "₹999.00");
    }

    #[test]
    fn test_thousands_grouping() {
        let m = Money::new(dec!(1234567.8), Currency::USD);
        assert_eq!(m.to_display_string(), "$1,234,567.80");
    }
}

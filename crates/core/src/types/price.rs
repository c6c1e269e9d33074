//! Type-safe price representation using decimal arithmetic.
//!
//! Shopify surfaces prices in several shapes depending on the API and the
//! age of the data: a bare decimal string (`"29.00"`), a bare number
//! (`29.0`), or a money object (`{"amount": "29.00", "currency_code": "USD"}`).
//! [`PriceInput`] accepts all of them and [`PriceInput::normalize`] collapses
//! them into a single [`Price`] with a `Decimal` amount, so the rest of the
//! system never does float math on money.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while normalizing a price representation.
#[derive(Debug, Error)]
pub enum PriceError {
    /// The amount string could not be parsed as a decimal.
    #[error("unparseable price amount: {0:?}")]
    BadAmount(String),
    /// The numeric amount could not be represented as a decimal.
    #[error("unrepresentable price amount: {0}")]
    BadNumber(f64),
}

/// ISO 4217 currency codes.
///
/// Codes the store does not trade in deserialize as [`CurrencyCode::Other`]
/// rather than failing the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    Other,
}

impl CurrencyCode {
    /// Currency symbol used for display formatting.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD | Self::Other => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// The ISO 4217 code string.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD | Self::Other => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl From<String> for CurrencyCode {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "USD" => Self::USD,
            "EUR" => Self::EUR,
            "GBP" => Self::GBP,
            "CAD" => Self::CAD,
            "AUD" => Self::AUD,
            _ => Self::Other,
        }
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.code().to_string()
    }
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display (e.g., `"$19.99"`), always with two decimal places.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// A money object as Shopify's GraphQL APIs return it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyInput {
    /// Decimal amount as string (preserves precision).
    pub amount: String,
    /// ISO 4217 currency code; absent in some legacy payloads.
    #[serde(default)]
    pub currency_code: Option<CurrencyCode>,
}

/// A heterogeneous price representation, as found in the wild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    /// Money object with amount and currency.
    Money(MoneyInput),
    /// Bare decimal string, e.g. `"29.00"`.
    Text(String),
    /// Bare JSON number, e.g. `29.0`.
    Number(f64),
}

impl PriceInput {
    /// Collapse any accepted representation into a [`Price`].
    ///
    /// Representations without a currency default to USD.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if the amount cannot be parsed as a decimal.
    pub fn normalize(&self) -> Result<Price, PriceError> {
        match self {
            Self::Money(money) => {
                let amount = parse_amount(&money.amount)?;
                Ok(Price::new(amount, money.currency_code.unwrap_or_default()))
            }
            Self::Text(text) => {
                let amount = parse_amount(text)?;
                Ok(Price::new(amount, CurrencyCode::default()))
            }
            Self::Number(number) => {
                let amount = Decimal::try_from(*number)
                    .map_err(|_| PriceError::BadNumber(*number))?;
                Ok(Price::new(amount, CurrencyCode::default()))
            }
        }
    }
}

/// Parse a decimal amount string, tolerating surrounding whitespace and a
/// leading currency symbol (legacy payloads carry `"$29.00"`).
fn parse_amount(raw: &str) -> Result<Decimal, PriceError> {
    let trimmed = raw.trim().trim_start_matches(['$', '\u{20ac}', '\u{a3}']);
    Decimal::from_str(trimmed).map_err(|_| PriceError::BadAmount(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_decimal_string() {
        let price = PriceInput::Text("29.00".to_string())
            .normalize()
            .expect("valid decimal string");
        assert_eq!(price.amount, Decimal::new(2900, 2));
        assert_eq!(price.currency_code, CurrencyCode::USD);
    }

    #[test]
    fn test_normalize_string_with_symbol_and_whitespace() {
        let price = PriceInput::Text(" $19.95 ".to_string())
            .normalize()
            .expect("valid prefixed string");
        assert_eq!(price.display(), "$19.95");
    }

    #[test]
    fn test_normalize_number() {
        let price = PriceInput::Number(42.5).normalize().expect("valid number");
        assert_eq!(price.display(), "$42.50");
    }

    #[test]
    fn test_normalize_money_object() {
        let price = PriceInput::Money(MoneyInput {
            amount: "15.00".to_string(),
            currency_code: Some(CurrencyCode::EUR),
        })
        .normalize()
        .expect("valid money object");
        assert_eq!(price.currency_code, CurrencyCode::EUR);
        assert_eq!(price.display(), "\u{20ac}15.00");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = PriceInput::Text("twenty bucks".to_string())
            .normalize()
            .expect_err("garbage should not parse");
        assert!(matches!(err, PriceError::BadAmount(_)));
    }

    #[test]
    fn test_price_input_deserializes_all_shapes() {
        let from_string: PriceInput = serde_json::from_str("\"12.99\"").expect("string shape");
        let from_number: PriceInput = serde_json::from_str("12.99").expect("number shape");
        let from_object: PriceInput =
            serde_json::from_str(r#"{"amount": "12.99", "currency_code": "USD"}"#)
                .expect("object shape");

        for input in [from_string, from_number, from_object] {
            let price = input.normalize().expect("all shapes normalize");
            assert_eq!(price.display(), "$12.99");
        }
    }

    #[test]
    fn test_unknown_currency_falls_back() {
        let input: PriceInput =
            serde_json::from_str(r#"{"amount": "5.00", "currency_code": "JPY"}"#)
                .expect("unknown currency accepted");
        let price = input.normalize().expect("normalizes");
        assert_eq!(price.currency_code, CurrencyCode::Other);
    }

    #[test]
    fn test_display_pads_to_two_places() {
        let price = Price::new(Decimal::new(5, 0), CurrencyCode::USD);
        assert_eq!(price.display(), "$5.00");
    }
}

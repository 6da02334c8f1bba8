//! Money amounts as the commerce platform reports them.
//!
//! Amounts travel as an integer count of the currency's smallest unit plus
//! the number of fraction digits, so no floating point is involved until
//! display time (and even then only through [`Decimal`]).

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted by the shop.
///
/// Codes the shop does not sell in deserialize to [`CurrencyCode::Unknown`]
/// so a cart holding one still loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
    CHF,
    /// Any other currency, written back as the ISO "no currency" code.
    #[serde(rename = "XXX")]
    #[serde(other)]
    Unknown,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EUR => "EUR",
            Self::USD => "USD",
            Self::GBP => "GBP",
            Self::CHF => "CHF",
            Self::Unknown => "XXX",
        }
    }

    /// Symbol used when formatting amounts for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::EUR => "€",
            Self::USD => "$",
            Self::GBP => "£",
            Self::CHF => "CHF ",
            Self::Unknown => "",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Self::EUR),
            "USD" => Ok(Self::USD),
            "GBP" => Ok(Self::GBP),
            "CHF" => Ok(Self::CHF),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A monetary amount in cent precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
    /// Amount in the smallest unit of the currency.
    pub cent_amount: i64,
    /// Number of digits after the decimal separator.
    #[serde(default = "default_fraction_digits")]
    pub fraction_digits: u32,
}

const fn default_fraction_digits() -> u32 {
    2
}

impl Money {
    /// Create an amount from cents with the usual two fraction digits.
    #[must_use]
    pub const fn from_cents(cent_amount: i64, currency_code: CurrencyCode) -> Self {
        Self {
            currency_code,
            cent_amount,
            fraction_digits: 2,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::from_cents(0, currency_code)
    }

    /// The amount in the currency's standard unit (e.g. euros, not cents).
    ///
    /// `None` when the platform reports more fraction digits than a
    /// [`Decimal`] can hold.
    #[must_use]
    pub fn amount(&self) -> Option<Decimal> {
        Decimal::try_new(self.cent_amount, self.fraction_digits).ok()
    }

    /// Format for display, e.g. `€12.50`.
    #[must_use]
    pub fn display(&self) -> Option<String> {
        let amount = self.amount()?;
        Some(format!(
            "{}{:.prec$}",
            self.currency_code.symbol(),
            amount,
            prec = self.fraction_digits as usize
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_from_cents() {
        let money = Money::from_cents(1250, CurrencyCode::EUR);
        assert_eq!(money.amount(), Some(Decimal::new(125, 1)));
        assert_eq!(money.display().as_deref(), Some("€12.50"));
    }

    #[test]
    fn test_out_of_range_fraction_digits() {
        let money: Money = serde_json::from_str(
            r#"{"currencyCode":"EUR","centAmount":499,"fractionDigits":29}"#,
        )
        .unwrap();
        assert_eq!(money.amount(), None);
        assert_eq!(money.display(), None);
    }

    #[test]
    fn test_deserialize_platform_shape() {
        let money: Money = serde_json::from_str(
            r#"{"type":"centPrecision","currencyCode":"EUR","centAmount":499,"fractionDigits":2}"#,
        )
        .unwrap();
        assert_eq!(money, Money::from_cents(499, CurrencyCode::EUR));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_unknown_currency_is_tolerated() {
        let money: Money =
            serde_json::from_str(r#"{"currencyCode":"JPY","centAmount":500,"fractionDigits":0}"#)
                .unwrap();
        assert_eq!(money.currency_code, CurrencyCode::Unknown);
        assert_eq!(money.display().as_deref(), Some("500"));
        assert_eq!(
            serde_json::to_value(CurrencyCode::Unknown).unwrap(),
            serde_json::json!("XXX")
        );
    }
}

//! Currency and currency pair types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RateError;

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }

    fn is_valid_code(code: &str) -> bool {
        code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An ordered currency pair (base/quote).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Base currency (being priced).
    pub base: Currency,
    /// Quote currency (pricing currency).
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(base: impl Into<Currency>, quote: impl Into<Currency>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Get the inverse pair.
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// Key used for cache lookups, e.g. `USD/EUR`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Whether base and quote are the same currency.
    pub fn is_degenerate(&self) -> bool {
        self.base == self.quote
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = RateError;

    /// Accepts `USD/EUR`, `USD_EUR`, `USD-EUR` and `USDEUR`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (base, quote) = match s.find(['/', '_', '-']) {
            Some(idx) => (&s[..idx], &s[idx + 1..]),
            None if s.len() == 6 && s.is_ascii() => (&s[..3], &s[3..]),
            None => return Err(RateError::InvalidPair(s.to_string())),
        };

        let pair = CurrencyPair::new(base, quote);
        if !Currency::is_valid_code(pair.base.code())
            || !Currency::is_valid_code(pair.quote.code())
            || pair.is_degenerate()
        {
            return Err(RateError::InvalidPair(s.to_string()));
        }

        Ok(pair)
    }
}

impl From<(&str, &str)> for CurrencyPair {
    fn from((base, quote): (&str, &str)) -> Self {
        Self::new(base, quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_parsing() {
        let expected = CurrencyPair::new("USD", "EUR");
        assert_eq!("USD/EUR".parse::<CurrencyPair>().unwrap(), expected);
        assert_eq!("usd_eur".parse::<CurrencyPair>().unwrap(), expected);
        assert_eq!("USD-EUR".parse::<CurrencyPair>().unwrap(), expected);
        assert_eq!("USDEUR".parse::<CurrencyPair>().unwrap(), expected);
    }

    #[test]
    fn test_invalid_pairs() {
        assert!("USD".parse::<CurrencyPair>().is_err());
        assert!("USD/USD".parse::<CurrencyPair>().is_err());
        assert!("US/EURO".parse::<CurrencyPair>().is_err());
    }

    #[test]
    fn test_inverse_and_key() {
        let pair = CurrencyPair::new(Currency::gbp(), Currency::jpy());
        assert_eq!(pair.key(), "GBP/JPY");
        assert_eq!(pair.inverse().key(), "JPY/GBP");
        assert_eq!(pair.inverse().inverse(), pair);
    }
}

//! Error types for rate records.

use rust_decimal::Decimal;
use thiserror::Error;

/// Violations of the rate-record invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// Rate must be strictly positive.
    #[error("Rate must be positive, got {0}")]
    NonPositiveRate(Decimal),

    /// Bid and ask, when present, must both be positive.
    #[error("Bid and ask must be positive: bid {bid}, ask {ask}")]
    NonPositiveBidAsk { bid: Decimal, ask: Decimal },

    /// Bid at or above ask (zero or negative spread).
    #[error("Inverted quote: bid {bid} >= ask {ask}")]
    InvertedQuote { bid: Decimal, ask: Decimal },

    /// Unparseable or degenerate currency pair.
    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),
}

impl RateError {
    /// Get error code for published messages and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            RateError::NonPositiveRate(_) => "NON_POSITIVE_RATE",
            RateError::NonPositiveBidAsk { .. } => "NON_POSITIVE_BID_ASK",
            RateError::InvertedQuote { .. } => "INVERTED_QUOTE",
            RateError::InvalidPair(_) => "INVALID_PAIR",
        }
    }
}

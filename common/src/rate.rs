//! Rate records as cached and validated by the engine.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyPair;
use crate::error::RateError;

/// A single FX quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    /// The currency pair.
    pub pair: CurrencyPair,
    /// Quoted rate (units of quote per unit of base).
    pub rate: Decimal,
    /// Bid price, if the provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    /// Ask price, if the provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    /// When this rate was quoted.
    pub timestamp: DateTime<Utc>,
    /// When this rate entered the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    /// Source identifiers, in order of preference.
    #[serde(default)]
    pub providers: Vec<String>,
    /// Quality score (0-100) assigned by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl RateRecord {
    /// Create a new record quoted now.
    pub fn new(pair: CurrencyPair, rate: Decimal) -> Self {
        Self {
            pair,
            rate,
            bid: None,
            ask: None,
            timestamp: Utc::now(),
            cached_at: None,
            providers: Vec::new(),
            quality_score: None,
        }
    }

    /// Set bid and ask.
    pub fn with_bid_ask(mut self, bid: Decimal, ask: Decimal) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Set the quote timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the contributing providers.
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Check the record invariants.
    pub fn check(&self) -> Result<(), RateError> {
        if self.rate <= Decimal::ZERO {
            return Err(RateError::NonPositiveRate(self.rate));
        }

        if let (Some(bid), Some(ask)) = (self.bid, self.ask) {
            if bid <= Decimal::ZERO || ask <= Decimal::ZERO {
                return Err(RateError::NonPositiveBidAsk { bid, ask });
            }
            if bid >= ask {
                return Err(RateError::InvertedQuote { bid, ask });
            }
        }

        Ok(())
    }

    /// Spread as a percentage of the quoted rate. Negative when inverted.
    ///
    /// Saturates at `Decimal::MAX` (or `MIN` when inverted) if the ratio
    /// does not fit.
    pub fn spread_percent(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if !self.rate.is_zero() => {
                let saturated = if ask >= bid { Decimal::MAX } else { Decimal::MIN };
                let percent = ask
                    .checked_sub(bid)
                    .and_then(|spread| spread.checked_div(self.rate))
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
                Some(percent.unwrap_or(saturated))
            }
            _ => None,
        }
    }

    /// Time elapsed since the quote.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.timestamp)
    }

    /// Whether two records carry the same quote, ignoring cache bookkeeping.
    pub fn same_quote(&self, other: &RateRecord) -> bool {
        self.pair == other.pair
            && self.rate == other.rate
            && self.bid == other.bid
            && self.ask == other.ask
            && self.timestamp == other.timestamp
            && self.providers == other.providers
    }
}

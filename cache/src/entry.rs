//! Cache entries shared by both tiers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fxrate_common::{age_of, from_std, RateRecord};
use serde::{Deserialize, Serialize};

/// A cached rate with its expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached record; `cached_at` is set on insertion.
    pub record: RateRecord,
    /// Time to live in seconds.
    pub ttl_secs: u64,
    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Wrap a record, stamping its insertion time.
    pub fn new(mut record: RateRecord, ttl: Duration) -> Self {
        let cached_at = Utc::now();
        record.cached_at = Some(cached_at);
        Self {
            record,
            ttl_secs: ttl.as_secs().max(1),
            cached_at,
        }
    }

    /// Time since insertion.
    pub fn age(&self) -> chrono::Duration {
        age_of(self.cached_at)
    }

    /// Whether the TTL has elapsed.
    pub fn is_expired(&self) -> bool {
        self.age() >= chrono::Duration::seconds(self.ttl_secs as i64)
    }

    /// Whether the entry is older than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > from_std(max_age)
    }

    /// Whether the entry may serve a read that tolerates `max_age`.
    pub fn is_fresh_for(&self, max_age: Option<Duration>) -> bool {
        if self.is_expired() {
            return false;
        }
        match max_age {
            Some(max_age) => self.age() < from_std(max_age),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrate_common::CurrencyPair;
    use rust_decimal_macros::dec;

    fn entry() -> CacheEntry {
        let record = RateRecord::new(CurrencyPair::new("USD", "EUR"), dec!(0.92));
        CacheEntry::new(record, Duration::from_secs(60))
    }

    #[test]
    fn test_new_entry_is_fresh() {
        let entry = entry();
        assert_eq!(entry.record.cached_at, Some(entry.cached_at));
        assert!(!entry.is_expired());
        assert!(entry.is_fresh_for(None));
        assert!(entry.is_fresh_for(Some(Duration::from_secs(30))));
    }

    #[test]
    fn test_zero_max_age_is_never_fresh() {
        assert!(!entry().is_fresh_for(Some(Duration::ZERO)));
    }

    #[test]
    fn test_expiry_and_staleness() {
        let mut entry = entry();
        entry.cached_at = Utc::now() - chrono::Duration::seconds(120);

        assert!(entry.is_expired());
        assert!(entry.is_stale(Duration::from_secs(60)));
        assert!(!entry.is_fresh_for(None));
    }
}

//! Bounded in-process cache tier.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use tracing::debug;

use crate::entry::CacheEntry;
use crate::store::glob_match;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, (u64, CacheEntry)>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl Inner {
    fn unlink(&mut self, key: &str) -> Option<CacheEntry> {
        let (seq, entry) = self.entries.remove(key)?;
        self.order.remove(&seq);
        Some(entry)
    }
}

/// In-process tier with insertion-order eviction.
///
/// Once `capacity` pairs are held, inserting a new pair evicts the pair that
/// was written longest ago. Reads do not reorder entries.
#[derive(Debug)]
pub struct L1Cache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl L1Cache {
    /// Create a cache holding at most `capacity` pairs.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Get a copy of the entry for `key`.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().entries.get(key).map(|(_, e)| e.clone())
    }

    /// Insert or overwrite an entry, returning the key evicted to make room.
    pub fn insert(&self, key: String, entry: CacheEntry) -> Option<String> {
        let mut inner = self.inner.lock();

        // Overwrites move the pair to the newest position.
        inner.unlink(&key);

        let mut evicted = None;
        if inner.entries.len() >= self.capacity {
            if let Some((_, oldest)) = inner.order.pop_first() {
                inner.entries.remove(&oldest);
                debug!(pair = %oldest, "L1 evicted oldest entry");
                evicted = Some(oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(key, (seq, entry));

        evicted
    }

    /// Remove an entry.
    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().unlink(key)
    }

    /// Remove every entry whose key matches the glob, returning the count.
    pub fn remove_matching(&self, pattern: &str) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();

        for key in &keys {
            inner.unlink(key);
        }
        keys.len()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of pairs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copies of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let inner = self.inner.lock();
        inner
            .order
            .values()
            .filter_map(|k| inner.entries.get(k).map(|(_, e)| e.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrate_common::{CurrencyPair, RateRecord};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn entry(base: &str, quote: &str) -> CacheEntry {
        let record = RateRecord::new(CurrencyPair::new(base, quote), dec!(1.10));
        CacheEntry::new(record, Duration::from_secs(60))
    }

    #[test]
    fn test_insert_and_get() {
        let cache = L1Cache::new(10);
        cache.insert("USD/EUR".to_string(), entry("USD", "EUR"));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("USD/EUR").is_some());
        assert!(cache.get("EUR/USD").is_none());
    }

    #[test]
    fn test_evicts_oldest_inserted() {
        let cache = L1Cache::new(2);
        cache.insert("USD/EUR".to_string(), entry("USD", "EUR"));
        cache.insert("GBP/USD".to_string(), entry("GBP", "USD"));

        // Reads do not refresh position.
        cache.get("USD/EUR");

        let evicted = cache.insert("USD/JPY".to_string(), entry("USD", "JPY"));
        assert_eq!(evicted.as_deref(), Some("USD/EUR"));
        assert!(cache.get("USD/EUR").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_moves_to_newest() {
        let cache = L1Cache::new(2);
        cache.insert("USD/EUR".to_string(), entry("USD", "EUR"));
        cache.insert("GBP/USD".to_string(), entry("GBP", "USD"));
        assert!(cache.insert("USD/EUR".to_string(), entry("USD", "EUR")).is_none());

        let evicted = cache.insert("USD/JPY".to_string(), entry("USD", "JPY"));
        assert_eq!(evicted.as_deref(), Some("GBP/USD"));
    }

    #[test]
    fn test_remove_matching() {
        let cache = L1Cache::new(10);
        cache.insert("USD/EUR".to_string(), entry("USD", "EUR"));
        cache.insert("USD/JPY".to_string(), entry("USD", "JPY"));
        cache.insert("GBP/USD".to_string(), entry("GBP", "USD"));

        assert_eq!(cache.remove_matching("USD/*"), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.snapshot()[0].record.pair.key(), "GBP/USD");
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(capacity in 1usize..16, inserts in 0usize..64) {
            let cache = L1Cache::new(capacity);
            for i in 0..inserts {
                cache.insert(format!("P{:03}", i), entry("USD", "EUR"));
            }
            prop_assert_eq!(cache.len(), inserts.min(capacity));
            if inserts > capacity {
                // The survivors are exactly the most recent `capacity` inserts.
                let first_kept = format!("P{:03}", inserts - capacity);
                prop_assert!(cache.get(&first_kept).is_some());
                let first_dropped = format!("P{:03}", inserts - capacity - 1);
                prop_assert!(cache.get(&first_dropped).is_none());
            }
        }
    }
}

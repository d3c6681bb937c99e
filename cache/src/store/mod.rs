//! Distributed key-value store abstraction backing the L2 tier.
//!
//! The cache only talks to the store through [`DistributedStore`], so the
//! transport (Redis in production, [`MemoryStore`] in tests and single-node
//! deployments) can be swapped without touching cache logic. Pub/sub is part
//! of the same trait so update and alert messages follow the store.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CacheResult;

pub mod memory;
#[cfg(feature = "redis-store")]
pub mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis-store")]
pub use self::redis::RedisStore;

/// A message received on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMessage {
    pub channel: String,
    pub payload: String,
}

/// Shared key-value store with TTL expiry and pub/sub.
#[async_trait]
pub trait DistributedStore: Send + Sync {
    /// Get the store name for logs.
    fn name(&self) -> &str;

    /// Read a key; `None` when absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a key with expiry.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Write many keys in a single atomic round trip.
    async fn set_many_ex(&self, entries: Vec<(String, String, Duration)>) -> CacheResult<()>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// List keys matching a glob pattern (`*` and `?`).
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Publish a message, returning the number of receivers.
    async fn publish(&self, channel: &str, message: String) -> CacheResult<u64>;

    /// Subscribe to channels; messages arrive on the returned receiver.
    async fn subscribe(&self, channels: &[String]) -> CacheResult<mpsc::Receiver<StoreMessage>>;

    /// Round-trip liveness check.
    async fn ping(&self) -> CacheResult<()>;

    /// Apply a store-level memory cap and eviction policy.
    async fn configure_eviction(&self, _max_memory: Option<&str>, _policy: &str) -> CacheResult<()> {
        Ok(())
    }
}

/// Whole seconds for a store TTL; sub-second values round up to one.
pub fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

/// Glob matching with `*` (any run) and `?` (any single char).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }

    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "USD/EUR"));
        assert!(glob_match("USD/*", "USD/EUR"));
        assert!(glob_match("*/JPY", "GBP/JPY"));
        assert!(glob_match("???/EUR", "USD/EUR"));
        assert!(glob_match("fx:rates:*", "fx:rates:USD/EUR"));
        assert!(!glob_match("USD/*", "EUR/USD"));
        assert!(!glob_match("??/EUR", "USD/EUR"));
    }

    #[test]
    fn test_ttl_seconds() {
        assert_eq!(ttl_seconds(Duration::from_secs(300)), 300);
        assert_eq!(ttl_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }
}

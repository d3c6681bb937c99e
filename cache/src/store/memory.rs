//! In-process store with TTL expiry and broadcast pub/sub.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use super::{glob_match, DistributedStore, StoreMessage};
use crate::error::{CacheError, CacheResult};

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Store kept entirely in process memory.
///
/// Several [`RateCache`](crate::RateCache) instances sharing one `Arc<MemoryStore>`
/// behave like instances sharing a Redis server. The outage switch and the
/// injected latency let tests exercise the degraded paths.
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    channel: broadcast::Sender<StoreMessage>,
    hangups: broadcast::Sender<()>,
    online: AtomicBool,
    latency_ms: AtomicU64,
    eviction: RwLock<Option<(Option<String>, String)>>,
}

impl MemoryStore {
    /// Create an empty, reachable store.
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(1024);
        let (hangups, _) = broadcast::channel(1);
        Self {
            entries: DashMap::new(),
            channel,
            hangups,
            online: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
            eviction: RwLock::new(None),
        }
    }

    /// Simulate the store going down or coming back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Close every open subscription, as a dropped pub/sub connection would.
    pub fn close_subscriptions(&self) {
        let _ = self.hangups.send(());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_live()).count()
    }

    /// Check if the store holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eviction settings applied through [`DistributedStore::configure_eviction`].
    pub fn eviction_policy(&self) -> Option<(Option<String>, String)> {
        self.eviction.read().clone()
    }

    async fn check(&self) -> CacheResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Connectivity("memory store offline".to_string()))
        }
    }

    fn put(&self, key: String, value: String, ttl: Duration) {
        self.entries.insert(
            key,
            StoredValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DistributedStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check().await?;

        let live = self.entries.get(key).map(|e| e.is_live());
        match live {
            Some(true) => Ok(self.entries.get(key).map(|e| e.value.clone())),
            Some(false) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.check().await?;
        self.put(key.to_string(), value, ttl);
        Ok(())
    }

    async fn set_many_ex(&self, entries: Vec<(String, String, Duration)>) -> CacheResult<()> {
        self.check().await?;
        for (key, value, ttl) in entries {
            self.put(key, value, ttl);
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        self.check().await?;
        let removed = keys
            .iter()
            .filter_map(|k| self.entries.remove(k))
            .filter(|(_, v)| v.is_live())
            .count();
        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.check().await?;
        self.entries.retain(|_, v| v.is_live());
        Ok(self
            .entries
            .iter()
            .filter(|e| glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn publish(&self, channel: &str, message: String) -> CacheResult<u64> {
        self.check().await?;
        let receivers = self
            .channel
            .send(StoreMessage {
                channel: channel.to_string(),
                payload: message,
            })
            .unwrap_or(0);
        Ok(receivers as u64)
    }

    async fn subscribe(&self, channels: &[String]) -> CacheResult<mpsc::Receiver<StoreMessage>> {
        self.check().await?;

        let mut source = self.channel.subscribe();
        let mut hangup = self.hangups.subscribe();
        let channels = channels.to_vec();
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = hangup.recv() => break,
                    received = source.recv() => received,
                };
                match received {
                    Ok(msg) if channels.contains(&msg.channel) => {
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Memory store subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check().await
    }

    async fn configure_eviction(&self, max_memory: Option<&str>, policy: &str) -> CacheResult<()> {
        self.check().await?;
        *self.eviction.write() = Some((max_memory.map(str::to_string), policy.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store
            .set_ex("fx:rates:USD/EUR", "payload".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.get("fx:rates:USD/EUR").await.unwrap().as_deref(),
            Some("payload")
        );
        assert_eq!(store.delete(&["fx:rates:USD/EUR".to_string()]).await.unwrap(), 1);
        assert!(store.get("fx:rates:USD/EUR").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v".to_string(), Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = MemoryStore::new();
        store.set_online(false);

        let err = store.get("k").await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(store.ping().await.is_err());

        store.set_online(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_keys_by_pattern() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store
            .set_many_ex(vec![
                ("fx:rates:USD/EUR".to_string(), "a".to_string(), ttl),
                ("fx:rates:USD/JPY".to_string(), "b".to_string(), ttl),
                ("fx:rates:GBP/USD".to_string(), "c".to_string(), ttl),
            ])
            .await
            .unwrap();

        let mut keys = store.keys("fx:rates:USD/*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["fx:rates:USD/EUR", "fx:rates:USD/JPY"]);
    }

    #[tokio::test]
    async fn test_pub_sub_filters_channels() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe(&["rate-updates".to_string()]).await.unwrap();

        store.publish("rate-alerts", "ignored".to_string()).await.unwrap();
        store.publish("rate-updates", "hello".to_string()).await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.channel, "rate-updates");
        assert_eq!(msg.payload, "hello");
    }
}

//! Distributed cache tier: namespaced, encoded, time-bounded store access.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fxrate_common::CurrencyPair;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::alerts::AlertConfig;
use crate::codec::RateCodec;
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, CacheResult};
use crate::events::EventBus;
use crate::reconnect::{ConnectionMonitor, ConnectionState};
use crate::store::{DistributedStore, StoreMessage};

/// The L2 tier.
///
/// Every store call carries `store_timeout`. Timeouts and connectivity
/// failures are handed to the [`ConnectionMonitor`], which owns retries;
/// calls made while the store is down fail fast.
pub struct L2Cache {
    store: Arc<dyn DistributedStore>,
    codec: RateCodec,
    config: CacheConfig,
    monitor: Arc<ConnectionMonitor>,
}

impl L2Cache {
    /// Create the tier over `store`.
    pub fn new(store: Arc<dyn DistributedStore>, config: CacheConfig, bus: EventBus) -> Self {
        let monitor = Arc::new(ConnectionMonitor::new(
            store.clone(),
            config.reconnect.clone(),
            config.store_timeout,
            bus,
        ));
        Self {
            store,
            codec: RateCodec::from_config(&config),
            config,
            monitor,
        }
    }

    /// Connection state of the underlying store.
    pub fn connection_state(&self) -> ConnectionState {
        self.monitor.state()
    }

    /// Report a failure noticed outside a store call, such as a closed
    /// subscription.
    pub fn connection_lost(&self, reason: &str) {
        self.monitor.connection_lost(reason);
    }

    /// Name of the underlying store.
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        if let Some(err) = self.monitor.unavailable() {
            return Err(err);
        }

        let result = match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                operation,
                after: self.config.store_timeout,
            }),
        };

        if let Err(e) = &result {
            if e.is_connectivity() {
                self.monitor.connection_lost(&e.to_string());
            }
        }
        result
    }

    /// Read a rate entry. Corrupt payloads surface as `Serialization`.
    pub async fn get_entry(&self, pair: &CurrencyPair) -> CacheResult<Option<CacheEntry>> {
        let key = self.config.rate_key(&pair.key());
        match self.call("get", self.store.get(&key)).await? {
            Some(payload) => self.codec.decode(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Write one rate entry.
    pub async fn put_entry(&self, entry: &CacheEntry, ttl: Duration) -> CacheResult<()> {
        let key = self.config.rate_key(&entry.record.pair.key());
        let payload = self.codec.encode(entry)?;
        self.call("set", self.store.set_ex(&key, payload, ttl)).await
    }

    /// Write many rate entries in one pipelined round trip.
    pub async fn put_entries(&self, entries: &[(CacheEntry, Duration)]) -> CacheResult<()> {
        let batch = entries
            .iter()
            .map(|(entry, ttl)| {
                let key = self.config.rate_key(&entry.record.pair.key());
                self.codec.encode(entry).map(|payload| (key, payload, *ttl))
            })
            .collect::<CacheResult<Vec<_>>>()?;

        self.call("pipeline", self.store.set_many_ex(batch)).await
    }

    /// Delete the rate entry for `pair`.
    pub async fn delete_entry(&self, pair: &CurrencyPair) -> CacheResult<bool> {
        let key = self.config.rate_key(&pair.key());
        let removed = self.call("del", self.store.delete(&[key])).await?;
        Ok(removed > 0)
    }

    /// Rate-entry keys whose pair part matches `pattern`.
    pub async fn rate_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let glob = self.config.rate_key(pattern);
        let keys = self.call("keys", self.store.keys(&glob)).await?;
        Ok(keys
            .into_iter()
            .filter(|k| self.config.is_rate_key(k))
            .collect())
    }

    /// Delete rate entries whose pair part matches `pattern`.
    pub async fn delete_matching(&self, pattern: &str) -> CacheResult<u64> {
        let keys = self.rate_keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.call("del", self.store.delete(&keys)).await
    }

    /// Read a persisted alert configuration.
    pub async fn get_alert(&self, pair: &CurrencyPair) -> CacheResult<Option<AlertConfig>> {
        let key = self.config.alert_key(&pair.key());
        match self.call("get", self.store.get(&key)).await? {
            Some(payload) => self.codec.decode(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Persist an alert configuration with the alert TTL.
    pub async fn put_alert(&self, alert: &AlertConfig) -> CacheResult<()> {
        let key = self.config.alert_key(&alert.pair.key());
        let payload = self.codec.encode(alert)?;
        self.call("set", self.store.set_ex(&key, payload, self.config.alert_ttl))
            .await
    }

    /// Publish a JSON message on `channel`.
    pub async fn publish<M: Serialize>(&self, channel: &str, message: &M) -> CacheResult<u64> {
        let payload = serde_json::to_string(message)?;
        self.call("publish", self.store.publish(channel, payload))
            .await
    }

    /// Subscribe to store channels.
    pub async fn subscribe(&self, channels: &[String]) -> CacheResult<mpsc::Receiver<StoreMessage>> {
        self.call("subscribe", self.store.subscribe(channels)).await
    }

    /// Round-trip liveness check.
    pub async fn ping(&self) -> CacheResult<()> {
        self.call("ping", self.store.ping()).await
    }

    /// Raw write used by the health self-test.
    pub async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.call("set", self.store.set_ex(key, value, ttl)).await
    }

    /// Raw read used by the health self-test.
    pub async fn get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        self.call("get", self.store.get(key)).await
    }

    /// Raw delete used by the health self-test.
    pub async fn delete_raw(&self, key: &str) -> CacheResult<u64> {
        self.call("del", self.store.delete(&[key.to_string()]))
            .await
    }

    /// Apply the configured memory cap and eviction policy.
    pub async fn configure_eviction(&self) -> CacheResult<()> {
        let max_memory = self.config.max_memory.as_deref();
        let policy = self.config.max_memory_policy.as_str();
        match self
            .call("config", self.store.configure_eviction(max_memory, policy))
            .await
        {
            Err(CacheError::Store(reason)) => {
                // Managed stores often forbid CONFIG; TTLs still bound memory.
                warn!(reason = %reason, "Store refused eviction settings");
                Ok(())
            }
            other => other,
        }
    }

    /// Manually retry the connection, clearing a failed state.
    pub async fn reconnect(&self) -> CacheResult<()> {
        self.monitor.reconnect_now().await
    }
}

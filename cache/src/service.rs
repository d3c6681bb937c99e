//! The two-tier rate cache service.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::Utc;
use fxrate_common::{from_std, is_older_than, CurrencyPair, RateRecord};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::alerts::{AlertConfig, AlertDirection, AlertManager, AlertOptions};
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::{CacheError, CacheResult};
use crate::events::{CacheEvent, EventBus, UpdateMessage};
use crate::health::{CacheInfo, HealthReport, HealthStatus};
use crate::l1::L1Cache;
use crate::l2::L2Cache;
use crate::reconnect::ConnectionState;
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::store::{DistributedStore, StoreMessage};

/// Options for [`RateCache::get_rate`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Skip L1 entries at least this old.
    pub max_age: Option<Duration>,
    /// Serve an old L1 entry rather than report a miss.
    pub allow_stale: bool,
}

impl GetOptions {
    /// Require data younger than `max_age`.
    pub fn max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
            ..Default::default()
        }
    }
}

/// Options for [`RateCache::set_rate`] and [`RateCache::set_rates`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Override the TTL chosen from the configuration.
    pub ttl: Option<Duration>,
}

impl SetOptions {
    /// Use an explicit TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}

/// Tier that answered a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    L1,
    L2,
}

/// A rate returned by [`RateCache::get_rate`].
#[derive(Debug, Clone)]
pub struct CachedRate {
    pub record: RateRecord,
    pub tier: CacheTier,
    pub is_stale: bool,
    pub age: chrono::Duration,
}

/// What [`RateCache::clear_cache`] removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    /// Every cached rate.
    All,
    /// Rates whose pair key (`BASE/QUOTE`) matches a glob.
    Pattern(String),
}

enum Listened {
    Message(Option<StoreMessage>),
    Event(Result<CacheEvent, RecvError>),
}

/// Entries removed by [`RateCache::clear_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub l1_removed: usize,
    pub l2_removed: u64,
}

/// Two-tier FX rate cache.
///
/// Reads check the in-process tier, then the distributed store. Writes go to
/// the store first, then L1, then publish an update and evaluate alerts.
/// Instances are independent; share a store between them to share rates.
pub struct RateCache {
    instance_id: String,
    config: CacheConfig,
    l1: L1Cache,
    l2: Arc<L2Cache>,
    alerts: Arc<AlertManager>,
    stats: Arc<CacheStats>,
    bus: EventBus,
}

impl RateCache {
    /// Create a cache over `store`.
    pub fn new(store: Arc<dyn DistributedStore>, config: CacheConfig) -> Self {
        let bus = EventBus::new(config.event_capacity);
        let stats = Arc::new(CacheStats::new());
        let l2 = Arc::new(L2Cache::new(store, config.clone(), bus.clone()));
        let alerts = Arc::new(AlertManager::new(
            l2.clone(),
            bus.clone(),
            stats.clone(),
            config.alert_notification_delay,
            config.alert_channel.clone(),
        ));

        Self {
            instance_id: format!("fxrate-{}", Uuid::new_v4()),
            l1: L1Cache::new(config.l1_capacity),
            config,
            l2,
            alerts,
            stats,
            bus,
        }
    }

    /// Use a fixed instance identifier instead of a generated one.
    ///
    /// Identifiers must be unique per instance sharing a store, or peers
    /// will ignore each other's updates.
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Identifier used as the source of published updates.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The configuration in use.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Verify the store is reachable and apply its eviction policy.
    #[instrument(skip(self), fields(instance = %self.instance_id))]
    pub async fn connect(&self) -> CacheResult<()> {
        self.l2.ping().await?;
        self.l2.configure_eviction().await?;
        info!(store = self.l2.store_name(), "Rate cache connected");
        Ok(())
    }

    /// Retry the store connection after reconnection gave up.
    pub async fn reconnect(&self) -> CacheResult<()> {
        self.l2.reconnect().await
    }

    /// Get a rate, preferring L1, then L2.
    ///
    /// Never fails: when the store is unreachable the L1 copy is returned
    /// (flagged stale) if there is one, otherwise `None`.
    #[instrument(skip(self, options), fields(pair = %pair))]
    pub async fn get_rate(&self, pair: &CurrencyPair, options: GetOptions) -> Option<CachedRate> {
        let key = pair.key();
        let local = self.l1.get(&key);

        if let Some(entry) = &local {
            if entry.is_fresh_for(options.max_age) {
                self.stats.l1_hit();
                return Some(self.cached(entry.clone(), CacheTier::L1, options.max_age));
            }
        }

        let remote = match self.l2.get_entry(pair).await {
            Ok(found) => found.filter(|entry| !entry.is_expired()),
            Err(CacheError::Serialization(reason)) => {
                self.stats.serialization_error();
                warn!(reason = %reason, "Corrupt cached rate treated as miss");
                None
            }
            Err(e) => {
                self.stats.error();
                debug!(error = %e, "Distributed tier unavailable, degrading to L1");
                return self.degraded(local);
            }
        };

        if let Some(entry) = remote {
            self.stats.l2_hit();
            self.insert_l1(key, entry.clone());
            return Some(self.cached(entry, CacheTier::L2, options.max_age));
        }

        if options.allow_stale {
            if let Some(entry) = local {
                return self.degraded(Some(entry));
            }
        }

        self.stats.miss();
        None
    }

    /// Write one rate to both tiers, publish it and evaluate its alert.
    #[instrument(skip(self, record, options), fields(pair = %record.pair))]
    pub async fn set_rate(&self, record: RateRecord, options: SetOptions) -> CacheResult<RateRecord> {
        self.check_record(&record)?;

        let ttl = self.resolve_ttl(&record, &options);
        let entry = CacheEntry::new(record, ttl);

        if let Err(e) = self.l2.put_entry(&entry, ttl).await {
            self.stats.write_failed();
            return Err(e);
        }
        self.insert_l1(entry.record.pair.key(), entry.clone());
        self.stats.sets(1);

        let record = entry.record;
        let message = UpdateMessage::Rate {
            pair: record.pair.key(),
            rate: record.rate,
            timestamp: record.timestamp,
            source: self.instance_id.clone(),
        };
        if let Err(e) = self.l2.publish(&self.config.update_channel, &message).await {
            warn!(error = %e, "Failed to publish rate update");
        }
        self.bus.emit(CacheEvent::RateUpdated {
            pair: record.pair.clone(),
            rate: record.rate,
            timestamp: record.timestamp,
        });

        if let Err(e) = self.alerts.check(&record).await {
            warn!(error = %e, "Alert check failed");
        }

        debug!(rate = %record.rate, ttl_secs = ttl.as_secs(), "Rate cached");
        Ok(record)
    }

    /// Write many rates with one pipelined store round trip.
    ///
    /// The whole batch is rejected if any record is invalid. Alert checks run
    /// as background tasks so they never delay the write.
    #[instrument(skip(self, records, options), fields(count = records.len()))]
    pub async fn set_rates(&self, records: Vec<RateRecord>, options: SetOptions) -> CacheResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        for record in &records {
            self.check_record(record)?;
        }

        let entries: Vec<(CacheEntry, Duration)> = records
            .into_iter()
            .map(|record| {
                let ttl = self.resolve_ttl(&record, &options);
                (CacheEntry::new(record, ttl), ttl)
            })
            .collect();

        if let Err(e) = self.l2.put_entries(&entries).await {
            self.stats.write_failed();
            return Err(e);
        }

        let count = entries.len();
        let mut pairs = Vec::with_capacity(count);
        for (entry, _) in &entries {
            pairs.push(entry.record.pair.clone());
            self.insert_l1(entry.record.pair.key(), entry.clone());
        }
        self.stats.sets(count as u64);

        let message = UpdateMessage::Batch {
            pairs: pairs.iter().map(CurrencyPair::key).collect(),
            count,
            timestamp: Utc::now(),
            source: self.instance_id.clone(),
        };
        if let Err(e) = self.l2.publish(&self.config.update_channel, &message).await {
            warn!(error = %e, "Failed to publish batch update");
        }
        self.bus.emit(CacheEvent::BatchUpdated { pairs });

        for (entry, _) in entries {
            let alerts = Arc::clone(&self.alerts);
            tokio::spawn(async move {
                if let Err(e) = alerts.check(&entry.record).await {
                    warn!(pair = %entry.record.pair, error = %e, "Alert check failed");
                }
            });
        }

        info!(count, "Rate batch cached");
        Ok(count)
    }

    /// Remove a rate from both tiers.
    #[instrument(skip(self), fields(pair = %pair))]
    pub async fn delete_rate(&self, pair: &CurrencyPair) -> CacheResult<bool> {
        let local = self.l1.remove(&pair.key()).is_some();
        let remote = match self.l2.delete_entry(pair).await {
            Ok(removed) => removed,
            Err(e) => {
                self.stats.write_failed();
                return Err(e);
            }
        };
        self.stats.delete();
        Ok(local || remote)
    }

    /// Remove rates from both tiers. Alert configurations are kept.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self, scope: ClearScope) -> CacheResult<ClearReport> {
        let pattern = match &scope {
            ClearScope::All => "*",
            ClearScope::Pattern(pattern) => pattern.as_str(),
        };

        let l1_removed = match &scope {
            ClearScope::All => {
                let count = self.l1.len();
                self.l1.clear();
                count
            }
            ClearScope::Pattern(_) => self.l1.remove_matching(pattern),
        };

        let l2_removed = match self.l2.delete_matching(pattern).await {
            Ok(removed) => removed,
            Err(e) => {
                self.stats.write_failed();
                return Err(e);
            }
        };

        info!(pattern, l1_removed, l2_removed, "Cache cleared");
        Ok(ClearReport {
            l1_removed,
            l2_removed,
        })
    }

    /// Register or overwrite the alert for `pair`.
    pub async fn set_rate_alert(
        &self,
        pair: CurrencyPair,
        threshold: Decimal,
        direction: AlertDirection,
        options: AlertOptions,
    ) -> CacheResult<AlertConfig> {
        self.alerts.set_alert(pair, threshold, direction, options).await
    }

    /// Get the alert registered for `pair`.
    pub async fn get_rate_alert(&self, pair: &CurrencyPair) -> CacheResult<Option<AlertConfig>> {
        self.alerts.get_alert(pair).await
    }

    /// Disable the alert for `pair`.
    pub async fn disable_rate_alert(&self, pair: &CurrencyPair) -> CacheResult<bool> {
        self.alerts.disable_alert(pair).await
    }

    /// Unexpired records held in L1, oldest first.
    pub fn snapshot(&self) -> Vec<RateRecord> {
        self.l1
            .snapshot()
            .into_iter()
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.record)
            .collect()
    }

    /// Subscribe to cache events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.bus.subscribe()
    }

    /// Counters snapshot.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Counters in Prometheus text format.
    pub fn metrics(&self) -> String {
        self.stats.to_prometheus()
    }

    /// Connection state of the distributed tier.
    pub fn connection_state(&self) -> ConnectionState {
        self.l2.connection_state()
    }

    /// Drop L1 copies of pairs that other instances update.
    ///
    /// If the subscription closes, the listener reports the connection as
    /// lost and subscribes again once the store is reconnected. It holds only
    /// a weak reference and stops once the cache is dropped.
    pub async fn start_invalidation_listener(self: &Arc<Self>) -> CacheResult<JoinHandle<()>> {
        let channels = vec![self.config.update_channel.clone()];
        let mut events = self.bus.subscribe();
        let subscription = self.l2.subscribe(&channels).await?;
        let cache: Weak<Self> = Arc::downgrade(self);

        info!(instance = %self.instance_id, channel = %self.config.update_channel, "Invalidation listener started");
        Ok(tokio::spawn(async move {
            let mut subscription = Some(subscription);
            loop {
                let next = match subscription.as_mut() {
                    Some(rx) => tokio::select! {
                        message = rx.recv() => Listened::Message(message),
                        event = events.recv() => Listened::Event(event),
                    },
                    None => Listened::Event(events.recv().await),
                };

                let Some(cache) = cache.upgrade() else {
                    break;
                };

                let resubscribe = match next {
                    Listened::Message(Some(message)) => {
                        cache.apply_remote_update(&message.payload);
                        false
                    }
                    Listened::Message(None) => {
                        warn!(instance = %cache.instance_id, "Update subscription closed");
                        subscription = None;
                        cache.l2.connection_lost("update subscription closed");
                        false
                    }
                    Listened::Event(Ok(CacheEvent::Reconnected { .. })) => true,
                    // A missed reconnect must not leave the listener deaf.
                    Listened::Event(Err(RecvError::Lagged(_))) => subscription.is_none(),
                    Listened::Event(Err(RecvError::Closed)) => break,
                    Listened::Event(Ok(_)) => false,
                };

                if resubscribe {
                    match cache.l2.subscribe(&channels).await {
                        Ok(rx) => {
                            info!(instance = %cache.instance_id, "Update subscription restored");
                            subscription = Some(rx);
                        }
                        Err(e) => warn!(error = %e, "Resubscribe failed; waiting for the next reconnect"),
                    }
                }
            }
            debug!("Invalidation listener stopped");
        }))
    }

    /// Run the store self-test and error-rate check.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthReport {
        let mut details = Vec::new();

        let started = Instant::now();
        let ping = self.l2.ping().await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let reachable = match ping {
            Ok(()) => true,
            Err(e) => {
                details.push(format!("ping failed: {}", e));
                false
            }
        };

        let write_read_ok = if reachable {
            match self.self_test().await {
                Ok(true) => true,
                Ok(false) => {
                    details.push("read-back did not match written value".to_string());
                    false
                }
                Err(e) => {
                    details.push(format!("self-test failed: {}", e));
                    false
                }
            }
        } else {
            false
        };

        let error_rate = self.stats.snapshot().error_rate();
        let error_rate_ok = error_rate <= self.config.health_error_rate_threshold;
        if !error_rate_ok {
            details.push(format!(
                "error rate {:.1}% above {:.1}%",
                error_rate * 100.0,
                self.config.health_error_rate_threshold * 100.0
            ));
        }

        let status = if !reachable {
            HealthStatus::Unhealthy
        } else if !write_read_ok || !error_rate_ok {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        if status != HealthStatus::Healthy {
            warn!(status = ?status, details = ?details, "Rate cache health check failed");
        }

        HealthReport {
            status,
            store: self.l2.store_name().to_string(),
            connection: self.l2.connection_state(),
            latency_ms,
            write_read_ok,
            error_rate,
            l1_entries: self.l1.len(),
            checked_at: Utc::now(),
            details,
        }
    }

    /// Observability snapshot.
    pub async fn cache_info(&self) -> CacheInfo {
        let l2_rate_keys = match self.l2.rate_keys("*").await {
            Ok(keys) => Some(keys.len()),
            Err(e) => {
                debug!(error = %e, "Could not list store keys");
                None
            }
        };

        CacheInfo {
            instance_id: self.instance_id.clone(),
            store: self.l2.store_name().to_string(),
            connection: self.l2.connection_state(),
            l1_entries: self.l1.len(),
            l1_capacity: self.l1.capacity(),
            l2_rate_keys,
            alert_configs: self.alerts.len(),
            default_ttl_secs: self.config.default_ttl.as_secs(),
            compression_threshold: self.config.compression_threshold,
            stats: self.stats.snapshot(),
        }
    }

    fn check_record(&self, record: &RateRecord) -> CacheResult<()> {
        record.check().map_err(|source| {
            warn!(pair = %record.pair, error = %source, "Rejected invalid rate");
            CacheError::InvalidRate {
                pair: record.pair.clone(),
                source,
            }
        })
    }

    fn resolve_ttl(&self, record: &RateRecord, options: &SetOptions) -> Duration {
        if let Some(ttl) = options.ttl {
            return ttl;
        }
        if is_older_than(record.timestamp, from_std(self.config.stale_after)) {
            self.config.historical_ttl
        } else {
            self.config.default_ttl
        }
    }

    fn insert_l1(&self, key: String, entry: CacheEntry) {
        if let Some(evicted) = self.l1.insert(key, entry) {
            self.stats.eviction();
            self.bus.emit(CacheEvent::Evicted { pair_key: evicted });
        }
    }

    fn cached(&self, entry: CacheEntry, tier: CacheTier, max_age: Option<Duration>) -> CachedRate {
        let is_stale = entry.is_stale(max_age.unwrap_or(self.config.stale_after));
        CachedRate {
            age: entry.age(),
            record: entry.record,
            tier,
            is_stale,
        }
    }

    fn degraded(&self, local: Option<CacheEntry>) -> Option<CachedRate> {
        match local {
            Some(entry) => {
                self.stats.stale_read();
                Some(CachedRate {
                    age: entry.age(),
                    record: entry.record,
                    tier: CacheTier::L1,
                    is_stale: true,
                })
            }
            None => {
                self.stats.miss();
                None
            }
        }
    }

    async fn self_test(&self) -> CacheResult<bool> {
        let key = self.config.health_key(&Uuid::new_v4().to_string());
        let value = format!("{}@{}", self.instance_id, Utc::now().to_rfc3339());

        self.l2.set_raw(&key, value.clone(), Duration::from_secs(10)).await?;
        let read = self.l2.get_raw(&key).await?;
        self.l2.delete_raw(&key).await?;

        Ok(read.as_deref() == Some(value.as_str()))
    }

    fn apply_remote_update(&self, payload: &str) -> usize {
        let message: UpdateMessage = match serde_json::from_str(payload) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable update message");
                return 0;
            }
        };

        if message.source() == self.instance_id {
            return 0;
        }

        let mut dropped = 0;
        for key in message.pair_keys() {
            if self.l1.remove(key).is_some() {
                dropped += 1;
                self.stats.invalidation();
                self.bus.emit(CacheEvent::Invalidated {
                    pair_key: key.to_string(),
                    source: message.source().to_string(),
                });
            }
        }

        if dropped > 0 {
            debug!(dropped, source = message.source(), "Invalidated L1 entries");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;
    use tokio_test::assert_ok;

    fn setup_cache() -> (Arc<MemoryStore>, RateCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = RateCache::new(store.clone(), CacheConfig::default());
        (store, cache)
    }

    fn usd_eur(rate: Decimal) -> RateRecord {
        RateRecord::new(CurrencyPair::new("USD", "EUR"), rate).with_providers(["ecb", "fed"])
    }

    #[tokio::test]
    async fn test_set_then_get_from_l1() {
        let (_, cache) = setup_cache();
        let record = usd_eur(dec!(0.92));

        let stored = assert_ok!(cache.set_rate(record.clone(), SetOptions::default()).await);
        assert!(stored.cached_at.is_some());

        let hit = cache
            .get_rate(&record.pair, GetOptions::default())
            .await
            .unwrap();
        assert_eq!(hit.tier, CacheTier::L1);
        assert!(!hit.is_stale);
        assert!(hit.record.same_quote(&record));
        assert_eq!(cache.stats().sets, 1);
        assert_eq!(cache.stats().l1_hits, 1);
    }

    #[tokio::test]
    async fn test_miss_on_empty_cache() {
        let (_, cache) = setup_cache();
        let pair = CurrencyPair::new("USD", "EUR");

        assert!(cache.get_rate(&pair, GetOptions::default()).await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_invalid_rate_not_cached() {
        let (store, cache) = setup_cache();
        let record = usd_eur(dec!(1.02)).with_bid_ask(dec!(1.05), dec!(1.00));

        let err = cache.set_rate(record.clone(), SetOptions::default()).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidRate { .. }));
        assert!(store.is_empty());
        assert!(cache.get_rate(&record.pair, GetOptions::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_write_fails_loudly_when_store_down() {
        let (store, cache) = setup_cache();
        store.set_online(false);

        let err = cache
            .set_rate(usd_eur(dec!(0.92)), SetOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(cache.stats().sets, 0);
    }

    #[tokio::test]
    async fn test_historical_quotes_use_historical_ttl() {
        let (_, cache) = setup_cache();
        let old = usd_eur(dec!(0.92)).with_timestamp(Utc::now() - chrono::Duration::hours(2));
        let fresh = usd_eur(dec!(0.92));

        assert_eq!(
            cache.resolve_ttl(&old, &SetOptions::default()),
            cache.config().historical_ttl
        );
        assert_eq!(
            cache.resolve_ttl(&fresh, &SetOptions::default()),
            cache.config().default_ttl
        );
        assert_eq!(
            cache.resolve_ttl(&old, &SetOptions::with_ttl(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn test_delete_rate_removes_both_tiers() {
        let (store, cache) = setup_cache();
        let record = usd_eur(dec!(0.92));
        cache.set_rate(record.clone(), SetOptions::default()).await.unwrap();

        assert!(cache.delete_rate(&record.pair).await.unwrap());
        assert!(store.is_empty());
        assert!(cache.get_rate(&record.pair, GetOptions::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_self_update_does_not_invalidate() {
        let (_, cache) = setup_cache();
        let record = usd_eur(dec!(0.92));
        cache.set_rate(record.clone(), SetOptions::default()).await.unwrap();

        let own = serde_json::to_string(&UpdateMessage::Rate {
            pair: record.pair.key(),
            rate: record.rate,
            timestamp: record.timestamp,
            source: cache.instance_id().to_string(),
        })
        .unwrap();
        assert_eq!(cache.apply_remote_update(&own), 0);

        let remote = own.replace(cache.instance_id(), "other-node");
        assert_eq!(cache.apply_remote_update(&remote), 1);
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[tokio::test]
    async fn test_health_check_states() {
        let (store, cache) = setup_cache();

        let report = cache.health_check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.write_read_ok);
        assert!(store.is_empty(), "self-test key must be cleaned up");

        store.set_online(false);
        let report = cache.health_check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!report.details.is_empty());
    }

    #[tokio::test]
    async fn test_connect_applies_eviction_policy() {
        let (store, cache) = setup_cache();
        cache.connect().await.unwrap();

        let (max_memory, policy) = store.eviction_policy().unwrap();
        assert_eq!(max_memory.as_deref(), Some("256mb"));
        assert_eq!(policy, "allkeys-lru");
    }
}

//! Rate cache configuration.

use std::str::FromStr;
use std::time::Duration;

use fxrate_common::{constants, DurationExt};
use serde::{Deserialize, Serialize};

use crate::reconnect::ReconnectPolicy;

/// Compression applied to large L2 payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Store payloads as plain JSON.
    None,
    /// Gzip + base64 above the threshold.
    Gzip,
}

impl FromStr for CompressionAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(CompressionAlgorithm::None),
            "gzip" => Ok(CompressionAlgorithm::Gzip),
            other => Err(format!("Unknown compression algorithm: {}", other)),
        }
    }
}

/// Configuration for the two-tier rate cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Namespace prefix for all store keys.
    pub key_prefix: String,
    /// TTL for freshly quoted rates.
    pub default_ttl: Duration,
    /// TTL for persisted alert configurations.
    pub alert_ttl: Duration,
    /// TTL for quotes that are already older than `stale_after` when written.
    pub historical_ttl: Duration,
    /// Entries older than this are flagged stale on read.
    pub stale_after: Duration,
    /// Hard capacity of the in-process tier.
    pub l1_capacity: usize,
    /// Payloads above this many bytes are compressed.
    pub compression_threshold: usize,
    /// Compression algorithm for large payloads.
    pub compression: CompressionAlgorithm,
    /// Minimum spacing between two alerts for the same pair.
    pub alert_notification_delay: Duration,
    /// Deadline for every distributed store call.
    pub store_timeout: Duration,
    /// Reconnection backoff.
    pub reconnect: ReconnectPolicy,
    /// Store-level memory cap (e.g. `256mb`); `None` leaves the store default.
    pub max_memory: Option<String>,
    /// Store-level eviction policy applied as a backstop to TTL expiry.
    pub max_memory_policy: String,
    /// Pub/sub channel for rate updates.
    pub update_channel: String,
    /// Pub/sub channel for rate alerts.
    pub alert_channel: String,
    /// Buffer size of the local event bus.
    pub event_capacity: usize,
    /// Error ratio above which the health check reports degraded.
    pub health_error_rate_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "fx:rates".to_string(),
            default_ttl: constants::default_rate_ttl().as_std(),
            alert_ttl: constants::alert_config_ttl().as_std(),
            historical_ttl: constants::historical_ttl().as_std(),
            stale_after: constants::stale_data_threshold().as_std(),
            l1_capacity: 1000,
            compression_threshold: 1024,
            compression: CompressionAlgorithm::Gzip,
            alert_notification_delay: Duration::from_secs(60),
            store_timeout: Duration::from_secs(2),
            reconnect: ReconnectPolicy::default(),
            max_memory: Some("256mb".to_string()),
            max_memory_policy: "allkeys-lru".to_string(),
            update_channel: "rate-updates".to_string(),
            alert_channel: "rate-alerts".to_string(),
            event_capacity: 1024,
            health_error_rate_threshold: 0.05,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl CacheConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(prefix) = std::env::var("FX_CACHE_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        if let Some(secs) = env_parse::<u64>("FX_CACHE_DEFAULT_TTL_SECS") {
            config.default_ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("FX_CACHE_ALERT_TTL_SECS") {
            config.alert_ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("FX_CACHE_HISTORICAL_TTL_SECS") {
            config.historical_ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("FX_CACHE_STALE_AFTER_SECS") {
            config.stale_after = Duration::from_secs(secs);
        }

        if let Some(capacity) = env_parse("FX_CACHE_L1_CAPACITY") {
            config.l1_capacity = capacity;
        }

        if let Some(threshold) = env_parse("FX_CACHE_COMPRESSION_THRESHOLD") {
            config.compression_threshold = threshold;
        }

        if let Some(algorithm) = env_parse("FX_CACHE_COMPRESSION") {
            config.compression = algorithm;
        }

        if let Some(secs) = env_parse::<u64>("FX_ALERT_NOTIFICATION_DELAY_SECS") {
            config.alert_notification_delay = Duration::from_secs(secs);
        }

        if let Some(ms) = env_parse::<u64>("FX_STORE_TIMEOUT_MS") {
            config.store_timeout = Duration::from_millis(ms);
        }

        if let Some(attempts) = env_parse("FX_STORE_MAX_RECONNECT_ATTEMPTS") {
            config.reconnect.max_attempts = attempts;
        }

        if let Some(ms) = env_parse::<u64>("FX_STORE_MAX_RECONNECT_DELAY_MS") {
            config.reconnect.max_delay = Duration::from_millis(ms);
        }

        if let Ok(max_memory) = std::env::var("FX_STORE_MAX_MEMORY") {
            config.max_memory = Some(max_memory).filter(|m| !m.is_empty());
        }

        if let Ok(policy) = std::env::var("FX_STORE_MAX_MEMORY_POLICY") {
            config.max_memory_policy = policy;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.key_prefix.is_empty() {
            return Err("Key prefix cannot be empty".to_string());
        }

        if self.l1_capacity == 0 {
            return Err("L1 capacity must be at least 1".to_string());
        }

        if self.default_ttl.as_secs() == 0 {
            return Err("Default TTL must be at least one second".to_string());
        }

        if self.store_timeout.is_zero() {
            return Err("Store timeout cannot be zero".to_string());
        }

        if self.update_channel.is_empty() || self.update_channel == self.alert_channel {
            return Err("Update and alert channels must be distinct and non-empty".to_string());
        }

        if !(0.0..=1.0).contains(&self.health_error_rate_threshold) {
            return Err("Health error-rate threshold must be within [0, 1]".to_string());
        }

        self.reconnect.validate()
    }

    /// Store key of a rate entry.
    pub fn rate_key(&self, pair_key: &str) -> String {
        format!("{}:{}", self.key_prefix, pair_key)
    }

    /// Store key of an alert configuration.
    pub fn alert_key(&self, pair_key: &str) -> String {
        format!("{}:alert:{}", self.key_prefix, pair_key)
    }

    /// Store key used by the health self-test.
    pub fn health_key(&self, id: &str) -> String {
        format!("{}:health:{}", self.key_prefix, id)
    }

    /// Whether a store key belongs to a rate entry.
    pub fn is_rate_key(&self, key: &str) -> bool {
        key.strip_prefix(&self.key_prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|rest| !rest.starts_with("alert:") && !rest.starts_with("health:"))
            .unwrap_or(false)
    }
}

//! Health and observability reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::reconnect::ConnectionState;
use crate::stats::CacheStatsSnapshot;

/// Overall health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store reachable, self-test passed, error rate normal.
    Healthy,
    /// Store reachable but the self-test failed or errors are elevated.
    Degraded,
    /// Store unreachable; reads are served from L1 only.
    Unhealthy,
}

/// Result of [`RateCache::health_check`](crate::RateCache::health_check).
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub store: String,
    pub connection: ConnectionState,
    pub latency_ms: u64,
    pub write_read_ok: bool,
    pub error_rate: f64,
    pub l1_entries: usize,
    pub checked_at: DateTime<Utc>,
    pub details: Vec<String>,
}

impl HealthReport {
    /// Check if the cache is fully operational.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Snapshot returned by [`RateCache::cache_info`](crate::RateCache::cache_info).
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub instance_id: String,
    pub store: String,
    pub connection: ConnectionState,
    pub l1_entries: usize,
    pub l1_capacity: usize,
    /// Rate keys in the store; `None` when the store could not be listed.
    pub l2_rate_keys: Option<usize>,
    pub alert_configs: usize,
    pub default_ttl_secs: u64,
    pub compression_threshold: usize,
    pub stats: CacheStatsSnapshot,
}

//! Per-pair rate alerts with rate-limited notification.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fxrate_common::{from_std, CurrencyPair, RateRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CacheError, CacheResult};
use crate::events::{AlertMessage, CacheEvent, EventBus};
use crate::l2::L2Cache;
use crate::stats::CacheStats;

/// Relative deviation that fires a `Both` alert (1%).
const DEVIATION_TRIGGER: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Which side of the threshold fires the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    /// Fire when the rate is above the threshold.
    Above,
    /// Fire when the rate is below the threshold.
    Below,
    /// Fire when the rate deviates from the threshold by more than 1%.
    Both,
}

impl AlertDirection {
    /// Whether `rate` fires an alert configured at `threshold`.
    pub fn is_triggered(&self, rate: Decimal, threshold: Decimal) -> bool {
        match self {
            AlertDirection::Above => rate > threshold,
            AlertDirection::Below => rate < threshold,
            AlertDirection::Both => {
                if threshold.is_zero() {
                    return false;
                }
                // A deviation too large to represent is past any trigger.
                rate.checked_sub(threshold)
                    .and_then(|diff| diff.abs().checked_div(threshold))
                    .map_or(true, |deviation| deviation > DEVIATION_TRIGGER)
            }
        }
    }
}

impl std::fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertDirection::Above => "above",
            AlertDirection::Below => "below",
            AlertDirection::Both => "both",
        };
        write!(f, "{}", s)
    }
}

/// Alert registration for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub pair: CurrencyPair,
    pub threshold: Decimal,
    pub direction: AlertDirection,
    pub enabled: bool,
    pub last_triggered: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    pub created_at: DateTime<Utc>,
}

impl AlertConfig {
    /// Create an enabled alert that has never fired.
    pub fn new(pair: CurrencyPair, threshold: Decimal, direction: AlertDirection) -> Self {
        Self {
            pair,
            threshold,
            direction,
            enabled: true,
            last_triggered: None,
            trigger_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Whether the alert fired less than `delay` ago.
    pub fn is_rate_limited(&self, now: DateTime<Utc>, delay: Duration) -> bool {
        self.last_triggered
            .map(|last| now.signed_duration_since(last) < from_std(delay))
            .unwrap_or(false)
    }
}

/// Options for [`AlertManager::set_alert`].
#[derive(Debug, Clone)]
pub struct AlertOptions {
    /// Register the alert enabled.
    pub enabled: bool,
}

impl Default for AlertOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Holds alert configurations and evaluates incoming rates against them.
pub struct AlertManager {
    configs: DashMap<String, AlertConfig>,
    l2: Arc<L2Cache>,
    bus: EventBus,
    stats: Arc<CacheStats>,
    notification_delay: Duration,
    channel: String,
}

impl AlertManager {
    /// Create an alert manager.
    pub fn new(
        l2: Arc<L2Cache>,
        bus: EventBus,
        stats: Arc<CacheStats>,
        notification_delay: Duration,
        channel: String,
    ) -> Self {
        Self {
            configs: DashMap::new(),
            l2,
            bus,
            stats,
            notification_delay,
            channel,
        }
    }

    /// Register or overwrite the alert for `pair`.
    pub async fn set_alert(
        &self,
        pair: CurrencyPair,
        threshold: Decimal,
        direction: AlertDirection,
        options: AlertOptions,
    ) -> CacheResult<AlertConfig> {
        if threshold <= Decimal::ZERO {
            return Err(CacheError::InvalidAlert {
                pair,
                reason: format!("threshold must be positive, got {}", threshold),
            });
        }

        let mut config = AlertConfig::new(pair, threshold, direction);
        config.enabled = options.enabled;

        self.l2.put_alert(&config).await?;
        self.configs.insert(config.pair.key(), config.clone());

        info!(
            pair = %config.pair,
            threshold = %threshold,
            direction = %direction,
            "Rate alert registered"
        );
        Ok(config)
    }

    /// Get the alert for `pair`, loading it from L2 if not held locally.
    pub async fn get_alert(&self, pair: &CurrencyPair) -> CacheResult<Option<AlertConfig>> {
        let key = pair.key();
        if let Some(config) = self.configs.get(&key) {
            return Ok(Some(config.clone()));
        }

        let loaded = self.l2.get_alert(pair).await?;
        if let Some(config) = &loaded {
            self.configs.entry(key).or_insert_with(|| config.clone());
        }
        Ok(loaded)
    }

    /// Disable the alert for `pair`. Returns false if none exists.
    pub async fn disable_alert(&self, pair: &CurrencyPair) -> CacheResult<bool> {
        let Some(mut config) = self.get_alert(pair).await? else {
            return Ok(false);
        };

        config.enabled = false;
        self.l2.put_alert(&config).await?;
        self.configs.insert(pair.key(), config);

        info!(pair = %pair, "Rate alert disabled");
        Ok(true)
    }

    /// Number of alert configurations held in memory.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Check if no alerts are held in memory.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Evaluate `record` against its pair's alert, firing at most once per
    /// notification window.
    pub async fn check(&self, record: &RateRecord) -> CacheResult<Option<AlertMessage>> {
        let Some(config) = self.get_alert(&record.pair).await? else {
            return Ok(None);
        };

        if !config.enabled || !config.direction.is_triggered(record.rate, config.threshold) {
            return Ok(None);
        }

        let now = Utc::now();
        let fired = {
            let mut entry = self
                .configs
                .entry(record.pair.key())
                .or_insert(config);
            if entry.is_rate_limited(now, self.notification_delay) {
                None
            } else {
                entry.last_triggered = Some(now);
                entry.trigger_count += 1;
                Some(entry.clone())
            }
        };

        let Some(config) = fired else {
            self.stats.alert_suppressed();
            debug!(pair = %record.pair, "Alert suppressed by notification delay");
            return Ok(None);
        };

        self.stats.alert_triggered();

        if let Err(e) = self.l2.put_alert(&config).await {
            warn!(pair = %config.pair, error = %e, "Failed to persist alert trigger");
        }

        let message = AlertMessage {
            pair: config.pair.key(),
            current_rate: record.rate,
            threshold: config.threshold,
            direction: config.direction,
            timestamp: now,
            trigger_count: config.trigger_count,
        };

        if let Err(e) = self.l2.publish(&self.channel, &message).await {
            warn!(pair = %config.pair, error = %e, "Failed to publish alert");
        }

        info!(
            pair = %config.pair,
            rate = %record.rate,
            threshold = %config.threshold,
            direction = %config.direction,
            trigger_count = config.trigger_count,
            "Rate alert triggered"
        );
        self.bus.emit(CacheEvent::AlertTriggered(message.clone()));

        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_above_and_below() {
        assert!(AlertDirection::Above.is_triggered(dec!(1.31), dec!(1.30)));
        assert!(!AlertDirection::Above.is_triggered(dec!(1.30), dec!(1.30)));
        assert!(AlertDirection::Below.is_triggered(dec!(1.29), dec!(1.30)));
        assert!(!AlertDirection::Below.is_triggered(dec!(1.31), dec!(1.30)));
    }

    #[test]
    fn test_both_is_one_percent_deviation() {
        // Crossing the threshold alone is not enough.
        assert!(!AlertDirection::Both.is_triggered(dec!(1.005), dec!(1.00)));
        assert!(!AlertDirection::Both.is_triggered(dec!(0.995), dec!(1.00)));
        assert!(AlertDirection::Both.is_triggered(dec!(1.02), dec!(1.00)));
        assert!(AlertDirection::Both.is_triggered(dec!(0.98), dec!(1.00)));
        assert!(!AlertDirection::Both.is_triggered(dec!(1.01), dec!(1.00)));
    }

    #[test]
    fn test_both_with_tiny_threshold_fires() {
        let tiny = Decimal::from_scientific("1e-20").unwrap();
        let large = Decimal::from_scientific("1e10").unwrap();
        assert!(AlertDirection::Both.is_triggered(large, tiny));
        assert!(!AlertDirection::Both.is_triggered(tiny, tiny));
    }

    #[test]
    fn test_rate_limit_window() {
        let mut config = AlertConfig::new(CurrencyPair::new("USD", "EUR"), dec!(0.9), AlertDirection::Above);
        let now = Utc::now();
        assert!(!config.is_rate_limited(now, Duration::from_secs(60)));

        config.last_triggered = Some(now - chrono::Duration::seconds(30));
        assert!(config.is_rate_limited(now, Duration::from_secs(60)));
        assert!(!config.is_rate_limited(now, Duration::from_secs(10)));
    }

    #[test]
    fn test_direction_wire_format() {
        assert_eq!(serde_json::to_string(&AlertDirection::Both).unwrap(), "\"both\"");
        let parsed: AlertDirection = serde_json::from_str("\"below\"").unwrap();
        assert_eq!(parsed, AlertDirection::Below);
    }
}

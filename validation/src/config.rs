//! Validation thresholds.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

/// Configuration for the [`ValidationEngine`](crate::ValidationEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Relative deviation from the historical mean that is flagged (0.10 = 10%).
    pub max_rate_deviation: f64,
    /// Quotes older than this are flagged stale.
    pub stale_data_threshold: Duration,
    /// Spread, as a percentage of the rate, that is flagged.
    pub max_spread_percent: f64,
    /// Fewer providers than this is flagged.
    pub min_provider_count: usize,
    /// At least one provider must score this much.
    pub min_reliability_score: f64,
    /// Reliability assumed for providers never assessed.
    pub initial_reliability_score: f64,
    /// Z-score above which a quote is an anomaly.
    pub z_score_threshold: f64,
    /// Observations needed before range and anomaly checks run.
    pub min_history_size: usize,
    /// Observations kept per pair.
    pub history_window: usize,
    /// Round-trip deviation reported as arbitrage (0.001 = 0.1%).
    pub max_triangular_deviation: Decimal,
    /// Allowed disagreement between a pair, its duplicates and its inverse.
    pub inverse_tolerance: Decimal,
    /// Rates scoring below this are invalid.
    pub min_quality_score: f64,
    /// Weight of the previous reliability score on each assessment.
    pub reliability_decay: f64,
    /// Quality observations kept per provider.
    pub reliability_history: usize,
    /// Share of anomalous rates that triggers a recommendation.
    pub anomaly_ratio_threshold: f64,
    /// Event channel capacity.
    pub event_capacity: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_rate_deviation: 0.10,
            stale_data_threshold: Duration::from_secs(300),
            max_spread_percent: 5.0,
            min_provider_count: 2,
            min_reliability_score: 0.5,
            initial_reliability_score: 1.0,
            z_score_threshold: 3.0,
            min_history_size: 10,
            history_window: 100,
            max_triangular_deviation: Decimal::new(1, 3),
            inverse_tolerance: Decimal::new(1, 3),
            min_quality_score: 70.0,
            reliability_decay: 0.95,
            reliability_history: 50,
            anomaly_ratio_threshold: 0.10,
            event_capacity: 256,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl ValidationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse("FX_VALIDATION_MAX_RATE_DEVIATION") {
            config.max_rate_deviation = v;
        }
        if let Some(secs) = env_parse::<u64>("FX_VALIDATION_STALE_SECS") {
            config.stale_data_threshold = Duration::from_secs(secs);
        }
        if let Some(v) = env_parse("FX_VALIDATION_MAX_SPREAD_PERCENT") {
            config.max_spread_percent = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_MIN_PROVIDERS") {
            config.min_provider_count = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_MIN_RELIABILITY") {
            config.min_reliability_score = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_Z_SCORE") {
            config.z_score_threshold = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_MIN_HISTORY") {
            config.min_history_size = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_HISTORY_WINDOW") {
            config.history_window = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_MAX_TRIANGULAR_DEVIATION") {
            config.max_triangular_deviation = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_INVERSE_TOLERANCE") {
            config.inverse_tolerance = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_MIN_QUALITY") {
            config.min_quality_score = v;
        }
        if let Some(v) = env_parse("FX_VALIDATION_RELIABILITY_DECAY") {
            config.reliability_decay = v;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_rate_deviation <= 0.0 {
            return Err("Max rate deviation must be positive".to_string());
        }

        if self.max_spread_percent <= 0.0 {
            return Err("Max spread percent must be positive".to_string());
        }

        if self.z_score_threshold <= 0.0 {
            return Err("Z-score threshold must be positive".to_string());
        }

        if self.min_history_size < 2 {
            return Err("Min history size must be at least 2".to_string());
        }

        if self.history_window < self.min_history_size {
            return Err("History window cannot be smaller than min history size".to_string());
        }

        if self.max_triangular_deviation <= Decimal::ZERO || self.inverse_tolerance <= Decimal::ZERO {
            return Err("Cross-rate tolerances must be positive".to_string());
        }

        if !(0.0..=100.0).contains(&self.min_quality_score) {
            return Err("Min quality score must be within [0, 100]".to_string());
        }

        if !(0.0..1.0).contains(&self.reliability_decay) {
            return Err("Reliability decay must be within [0, 1)".to_string());
        }

        if !(0.0..=1.0).contains(&self.min_reliability_score)
            || !(0.0..=1.0).contains(&self.initial_reliability_score)
        {
            return Err("Reliability scores must be within [0, 1]".to_string());
        }

        Ok(())
    }
}

//! Time utilities shared by the cache and validation engine.

use chrono::{DateTime, Duration, Utc};

/// Default timing constants.
pub mod constants {
    use super::Duration;

    /// Default TTL for cached rates (5 minutes).
    pub fn default_rate_ttl() -> Duration {
        Duration::minutes(5)
    }

    /// Default TTL for persisted alert configurations (24 hours).
    pub fn alert_config_ttl() -> Duration {
        Duration::hours(24)
    }

    /// Default TTL for historical rate keys (7 days).
    pub fn historical_ttl() -> Duration {
        Duration::days(7)
    }

    /// Age after which a quote is considered stale (5 minutes).
    pub fn stale_data_threshold() -> Duration {
        Duration::minutes(5)
    }
}

/// A timestamp (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Elapsed time since `timestamp`, never negative.
pub fn age_of(timestamp: Timestamp) -> Duration {
    let age = now() - timestamp;
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}

/// Check if `timestamp` is older than `max_age`.
pub fn is_older_than(timestamp: Timestamp, max_age: Duration) -> bool {
    age_of(timestamp) > max_age
}

/// Conversions between chrono and std durations.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}

/// Convert a std duration to chrono, saturating on overflow.
pub fn from_std(duration: std::time::Duration) -> Duration {
    Duration::from_std(duration).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_older_than() {
        let recent = now() - Duration::seconds(10);
        assert!(!is_older_than(recent, Duration::minutes(1)));

        let old = now() - Duration::minutes(10);
        assert!(is_older_than(old, constants::stale_data_threshold()));
    }

    #[test]
    fn test_future_timestamps_have_zero_age() {
        let future = now() + Duration::seconds(30);
        assert_eq!(age_of(future), Duration::zero());
    }

    #[test]
    fn test_duration_conversions() {
        let std = std::time::Duration::from_millis(1500);
        assert_eq!(from_std(std), Duration::milliseconds(1500));
        assert_eq!(Duration::seconds(-5).as_std(), std::time::Duration::ZERO);
    }
}

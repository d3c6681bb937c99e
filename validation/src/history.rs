//! Rolling per-pair rate history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// One recorded rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateObservation {
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// Bounded window of recent rates for one pair.
#[derive(Debug, Clone)]
pub struct RateHistoryWindow {
    values: VecDeque<RateObservation>,
    capacity: usize,
}

impl RateHistoryWindow {
    /// Create an empty window keeping at most `capacity` observations.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an observation, dropping the oldest when full.
    pub fn push(&mut self, rate: f64, timestamp: DateTime<Utc>) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(RateObservation { rate, timestamp });
    }

    /// Most recent observation.
    pub fn latest(&self) -> Option<&RateObservation> {
        self.values.back()
    }

    fn rates(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(|o| o.rate)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.rates().sum::<f64>() / self.values.len() as f64)
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self
            .rates()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / self.values.len() as f64;
        Some(variance.sqrt())
    }

    /// Distance of `value` from the mean in standard deviations.
    ///
    /// `None` for an empty or flat window.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        let mean = self.mean()?;
        let std_dev = self.std_dev()?;
        if std_dev <= f64::EPSILON {
            return None;
        }
        Some((value - mean).abs() / std_dev)
    }

    /// Relative deviation of `value` from the mean.
    pub fn relative_deviation(&self, value: f64) -> Option<f64> {
        let mean = self.mean()?;
        if mean == 0.0 {
            return None;
        }
        Some((value - mean).abs() / mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn filled(capacity: usize, rates: &[f64]) -> RateHistoryWindow {
        let mut window = RateHistoryWindow::new(capacity);
        for rate in rates {
            window.push(*rate, Utc::now());
        }
        window
    }

    #[test]
    fn test_window_is_bounded() {
        let window = filled(3, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), Some(3.0));
        assert_eq!(window.latest().map(|o| o.rate), Some(4.0));
    }

    #[test]
    fn test_oldest_observation_is_dropped_first() {
        let start = Utc::now() - Duration::minutes(3);
        let mut window = RateHistoryWindow::new(2);
        for minute in 0..3 {
            window.push(1.0 + minute as f64, start + Duration::minutes(minute));
        }

        let latest = window.latest().unwrap();
        assert_eq!(latest.rate, 3.0);
        assert_eq!(latest.timestamp, start + Duration::minutes(2));
        assert_eq!(window.mean(), Some(2.5));
    }

    #[test]
    fn test_statistics() {
        let window = filled(10, &[1.09, 1.11, 1.09, 1.11]);
        let mean = window.mean().unwrap();
        let std_dev = window.std_dev().unwrap();
        assert!((mean - 1.10).abs() < 1e-9);
        assert!((std_dev - 0.01).abs() < 1e-9);

        let z = window.z_score(1.50).unwrap();
        assert!((z - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_window_has_no_z_score() {
        let window = filled(5, &[1.0, 1.0]);
        assert_eq!(window.z_score(2.0), None);
        assert_eq!(window.relative_deviation(1.1).map(|d| (d * 100.0).round()), Some(10.0));
        assert_eq!(RateHistoryWindow::new(5).mean(), None);
    }
}

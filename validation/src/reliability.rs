//! Decaying provider reliability scores.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

/// Reliability state of one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderReliability {
    pub provider: String,
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Recent average quality observations, oldest first.
    pub recent_quality: VecDeque<f64>,
    pub assessments: u64,
    pub last_updated: DateTime<Utc>,
}

/// Tracks provider reliability across validation runs.
///
/// Each assessment moves the score toward `quality / 100` with weight
/// `1 - decay`, so it converges on the provider's typical quality.
pub struct ReliabilityTracker {
    providers: DashMap<String, ProviderReliability>,
    decay: f64,
    initial_score: f64,
    history: usize,
}

impl ReliabilityTracker {
    pub fn new(decay: f64, initial_score: f64, history: usize) -> Self {
        Self {
            providers: DashMap::new(),
            decay: decay.clamp(0.0, 1.0),
            initial_score: initial_score.clamp(0.0, 1.0),
            history: history.max(1),
        }
    }

    /// Current score, or the initial score for unknown providers.
    pub fn score(&self, provider: &str) -> f64 {
        self.providers
            .get(provider)
            .map(|p| p.score)
            .unwrap_or(self.initial_score)
    }

    /// Full state of a provider that has been assessed.
    pub fn get(&self, provider: &str) -> Option<ProviderReliability> {
        self.providers.get(provider).map(|p| p.clone())
    }

    /// Fold an average quality score (0-100) into the provider's reliability.
    pub fn record(&self, provider: &str, average_quality: f64) -> f64 {
        let quality = (average_quality / 100.0).clamp(0.0, 1.0);
        let mut entry = self
            .providers
            .entry(provider.to_string())
            .or_insert_with(|| ProviderReliability {
                provider: provider.to_string(),
                score: self.initial_score,
                recent_quality: VecDeque::with_capacity(self.history),
                assessments: 0,
                last_updated: Utc::now(),
            });

        entry.score = entry.score * self.decay + quality * (1.0 - self.decay);
        if entry.recent_quality.len() == self.history {
            entry.recent_quality.pop_front();
        }
        entry.recent_quality.push_back(average_quality);
        entry.assessments += 1;
        entry.last_updated = Utc::now();

        debug!(provider, score = entry.score, average_quality, "Provider reliability updated");
        entry.score
    }

    /// Providers whose score is below `threshold`, sorted by name.
    pub fn below(&self, threshold: f64) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .iter()
            .filter(|p| p.score < threshold)
            .map(|p| p.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of providers assessed.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

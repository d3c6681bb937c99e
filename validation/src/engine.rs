//! Rate validation engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use fxrate_common::{from_std, CurrencyPair, RateError, RateRecord};
use parking_lot::RwLock;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::ValidationConfig;
use crate::cross_rate::{find_inconsistencies, find_triangular_arbitrage, QuoteBook};
use crate::history::RateHistoryWindow;
use crate::reliability::{ProviderReliability, ReliabilityTracker};
use crate::result::{IssueKind, RateValidation, ValidationEvent, ValidationIssue, ValidationResult};

const RANGE_PENALTY: f64 = 20.0;
const STALE_PENALTY: f64 = 15.0;
const SPREAD_PENALTY: f64 = 10.0;
const PROVIDER_PENALTY: f64 = 10.0;
const INCONSISTENCY_PENALTY: f64 = 10.0;
const ARBITRAGE_BONUS: f64 = 2.0;
const ARBITRAGE_BONUS_CAP: f64 = 10.0;

/// Extra context for [`ValidationEngine::validate_rates`].
#[derive(Debug, Clone, Default)]
pub struct ValidationMetadata {
    /// Provider lists keyed by pair (`BASE/QUOTE`), replacing the records' own.
    pub providers: HashMap<String, Vec<String>>,
    /// Label of the snapshot's origin, echoed in the result.
    pub source: Option<String>,
}

/// Engine counters.
#[derive(Debug, Default)]
struct Counters {
    validations: AtomicU64,
    rates_validated: AtomicU64,
    rates_rejected: AtomicU64,
    anomalies: AtomicU64,
    arbitrage: AtomicU64,
    inconsistencies: AtomicU64,
}

/// Snapshot returned by [`ValidationEngine::validation_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationStats {
    pub validations: u64,
    pub rates_validated: u64,
    pub rates_rejected: u64,
    pub anomalies_detected: u64,
    pub arbitrage_opportunities: u64,
    pub inconsistencies: u64,
    pub last_quality_score: Option<f64>,
    pub tracked_pairs: usize,
    pub tracked_providers: usize,
}

/// Scores FX rate snapshots.
///
/// Keeps a rolling history per pair and a reliability score per provider, so
/// results depend on what the engine has seen before. Construct one engine
/// per independent feed.
pub struct ValidationEngine {
    config: ValidationConfig,
    history: DashMap<String, RateHistoryWindow>,
    reliability: ReliabilityTracker,
    counters: Counters,
    last_quality: RwLock<Option<f64>>,
    events: broadcast::Sender<ValidationEvent>,
}

impl ValidationEngine {
    pub fn new(config: ValidationConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            reliability: ReliabilityTracker::new(
                config.reliability_decay,
                config.initial_reliability_score,
                config.reliability_history,
            ),
            history: DashMap::new(),
            counters: Counters::default(),
            last_quality: RwLock::new(None),
            events,
            config,
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a snapshot: per-rate checks, cross-rate checks, provider
    /// reliability and an aggregate score.
    ///
    /// Never fails; every rate gets an outcome.
    #[instrument(skip(self, records, metadata), fields(count = records.len()))]
    pub fn validate_rates(&self, records: &[RateRecord], metadata: &ValidationMetadata) -> ValidationResult {
        let started = Instant::now();
        self.counters.validations.fetch_add(1, Ordering::Relaxed);

        if records.is_empty() {
            warn!("Validation called with an empty snapshot");
            return self.finish(ValidationResult {
                is_valid: false,
                quality_score: 0.0,
                rates: Vec::new(),
                arbitrage: Vec::new(),
                inconsistencies: Vec::new(),
                provider_scores: BTreeMap::new(),
                recommendations: vec!["No rates supplied: check upstream ingestion".to_string()],
                source: metadata.source.clone(),
                validated_at: Utc::now(),
                elapsed: started.elapsed(),
            });
        }

        let records: Vec<RateRecord> = records
            .iter()
            .map(|record| match metadata.providers.get(&record.pair.key()) {
                Some(providers) => record.clone().with_providers(providers.iter().cloned()),
                None => record.clone(),
            })
            .collect();

        let rates: Vec<RateValidation> = records
            .iter()
            .map(|record| self.validate_single_rate(record))
            .collect();

        let arbitrage =
            find_triangular_arbitrage(&QuoteBook::new(&records), self.config.max_triangular_deviation);
        let inconsistencies = find_inconsistencies(&records, self.config.inverse_tolerance);

        for opportunity in &arbitrage {
            info!(opportunity = %opportunity, "Triangular arbitrage detected");
        }
        for inconsistency in &inconsistencies {
            warn!(
                pair = %inconsistency.pair,
                other = %inconsistency.other,
                deviation = %inconsistency.deviation,
                "Cross-rate inconsistency"
            );
        }

        let provider_scores = self.assess_providers(&rates);

        let mean = rates.iter().map(|r| r.quality_score).sum::<f64>() / rates.len() as f64;
        let bonus = (ARBITRAGE_BONUS * arbitrage.len() as f64).min(ARBITRAGE_BONUS_CAP);
        let quality_score =
            (mean - INCONSISTENCY_PENALTY * inconsistencies.len() as f64 + bonus).clamp(0.0, 100.0);

        self.counters
            .arbitrage
            .fetch_add(arbitrage.len() as u64, Ordering::Relaxed);
        self.counters
            .inconsistencies
            .fetch_add(inconsistencies.len() as u64, Ordering::Relaxed);

        let mut result = ValidationResult {
            is_valid: quality_score >= self.config.min_quality_score,
            quality_score,
            rates,
            arbitrage,
            inconsistencies,
            provider_scores,
            recommendations: Vec::new(),
            source: metadata.source.clone(),
            validated_at: Utc::now(),
            elapsed: Duration::ZERO,
        };
        result.recommendations = self.recommend(&result);
        result.elapsed = started.elapsed();

        self.finish(result)
    }

    /// Validate one rate and record it in the pair's history.
    ///
    /// Rates failing a hard rule score 0 and are not recorded.
    pub fn validate_single_rate(&self, record: &RateRecord) -> RateValidation {
        self.counters.rates_validated.fetch_add(1, Ordering::Relaxed);

        if let Some(issue) = hard_error(record) {
            self.counters.rates_rejected.fetch_add(1, Ordering::Relaxed);
            warn!(pair = %record.pair, rate = %record.rate, reason = %issue.message, "Rate rejected");
            return RateValidation {
                pair: record.pair.clone(),
                rate: record.rate,
                quality_score: 0.0,
                is_valid: false,
                issues: vec![issue],
                z_score: None,
                providers: record.providers.clone(),
            };
        }

        let key = record.pair.key();
        let value = record.rate.to_f64().unwrap_or_default();
        let mut issues = Vec::new();
        let mut z_score = None;

        // Read the window and release the shard before recording.
        let window = self
            .history
            .get(&key)
            .map(|w| (w.len(), w.mean(), w.std_dev(), w.z_score(value), w.relative_deviation(value)));

        match window {
            Some((len, Some(mean), std_dev, z, deviation)) if len >= self.config.min_history_size => {
                if let Some(deviation) = deviation.filter(|d| *d > self.config.max_rate_deviation) {
                    issues.push(ValidationIssue::warning(
                        IssueKind::RangeDeviation,
                        format!(
                            "Rate deviates {:.2}% from historical mean {:.6}",
                            deviation * 100.0,
                            mean
                        ),
                        RANGE_PENALTY,
                    ));
                }

                z_score = z;
                if let Some(z) = z.filter(|z| *z > self.config.z_score_threshold) {
                    let std_dev = std_dev.unwrap_or_default();
                    issues.push(ValidationIssue::warning(
                        IssueKind::Anomaly,
                        format!("Z-score {:.2} exceeds {:.2}", z, self.config.z_score_threshold),
                        (10.0 * z).clamp(30.0, 50.0),
                    ));
                    self.counters.anomalies.fetch_add(1, Ordering::Relaxed);
                    warn!(pair = %record.pair, rate = %record.rate, z_score = z, mean, "Rate anomaly detected");
                    self.emit(ValidationEvent::AnomalyDetected {
                        pair: record.pair.clone(),
                        rate: record.rate,
                        z_score: z,
                        mean,
                        std_dev,
                    });
                }
            }
            other => {
                let len = other.map(|(len, ..)| len).unwrap_or(0);
                issues.push(ValidationIssue::warning(
                    IssueKind::InsufficientHistory,
                    format!(
                        "{} of {} observations needed for range and anomaly checks",
                        len, self.config.min_history_size
                    ),
                    0.0,
                ));
            }
        }

        let age = record.age();
        if age > from_std(self.config.stale_data_threshold) {
            issues.push(ValidationIssue::warning(
                IssueKind::StaleData,
                format!("Quote is {}s old", age.num_seconds()),
                STALE_PENALTY,
            ));
        }

        if let Some(spread) = record.spread_percent().and_then(|s| s.to_f64()) {
            if spread > self.config.max_spread_percent {
                issues.push(ValidationIssue::warning(
                    IssueKind::WideSpread,
                    format!(
                        "Spread {:.2}% exceeds {:.2}%",
                        spread, self.config.max_spread_percent
                    ),
                    SPREAD_PENALTY,
                ));
            }
        }

        issues.extend(self.check_providers(&record.providers));

        self.history
            .entry(key)
            .or_insert_with(|| RateHistoryWindow::new(self.config.history_window))
            .push(value, record.timestamp);

        let penalty: f64 = issues.iter().map(|i| i.penalty).sum();
        let quality_score = (100.0 - penalty).clamp(0.0, 100.0);
        let is_valid = quality_score >= self.config.min_quality_score;
        if !is_valid {
            self.counters.rates_rejected.fetch_add(1, Ordering::Relaxed);
        }

        debug!(pair = %record.pair, quality_score, issues = issues.len(), "Rate validated");

        RateValidation {
            pair: record.pair.clone(),
            rate: record.rate,
            quality_score,
            is_valid,
            issues,
            z_score,
            providers: record.providers.clone(),
        }
    }

    /// Counters snapshot.
    pub fn validation_stats(&self) -> ValidationStats {
        ValidationStats {
            validations: self.counters.validations.load(Ordering::Relaxed),
            rates_validated: self.counters.rates_validated.load(Ordering::Relaxed),
            rates_rejected: self.counters.rates_rejected.load(Ordering::Relaxed),
            anomalies_detected: self.counters.anomalies.load(Ordering::Relaxed),
            arbitrage_opportunities: self.counters.arbitrage.load(Ordering::Relaxed),
            inconsistencies: self.counters.inconsistencies.load(Ordering::Relaxed),
            last_quality_score: *self.last_quality.read(),
            tracked_pairs: self.history.len(),
            tracked_providers: self.reliability.len(),
        }
    }

    /// Reliability state of an assessed provider.
    pub fn provider_reliability(&self, provider: &str) -> Option<ProviderReliability> {
        self.reliability.get(provider)
    }

    /// Current reliability score, including the default for unknown providers.
    pub fn provider_score(&self, provider: &str) -> f64 {
        self.reliability.score(provider)
    }

    /// Observations held for `pair`.
    pub fn history_len(&self, pair: &CurrencyPair) -> usize {
        self.history.get(&pair.key()).map(|w| w.len()).unwrap_or(0)
    }

    /// Subscribe to anomaly and completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        self.events.subscribe()
    }

    fn check_providers(&self, providers: &[String]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if providers.len() < self.config.min_provider_count {
            issues.push(ValidationIssue::warning(
                IssueKind::InsufficientProviders,
                format!(
                    "{} provider(s), {} required",
                    providers.len(),
                    self.config.min_provider_count
                ),
                PROVIDER_PENALTY,
            ));
        }

        let reliable = providers
            .iter()
            .any(|p| self.reliability.score(p) >= self.config.min_reliability_score);
        if !providers.is_empty() && !reliable {
            issues.push(ValidationIssue::warning(
                IssueKind::UnreliableProviders,
                format!(
                    "No provider meets reliability {:.2}",
                    self.config.min_reliability_score
                ),
                PROVIDER_PENALTY,
            ));
        }

        issues
    }

    fn assess_providers(&self, rates: &[RateValidation]) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for rate in rates {
            for provider in &rate.providers {
                let total = totals.entry(provider.as_str()).or_insert((0.0, 0));
                total.0 += rate.quality_score;
                total.1 += 1;
            }
        }

        totals
            .into_iter()
            .map(|(provider, (sum, count))| {
                let score = self.reliability.record(provider, sum / count as f64);
                (provider.to_string(), score)
            })
            .collect()
    }

    fn recommend(&self, result: &ValidationResult) -> Vec<String> {
        let mut recommendations = Vec::new();
        let total = result.rates.len();

        if result.quality_score < self.config.min_quality_score {
            recommendations.push(format!(
                "Quality score {:.1} below threshold {:.1}: review rate sources",
                result.quality_score, self.config.min_quality_score
            ));
        }

        let rejected = result.rejected().count();
        if rejected > 0 {
            recommendations.push(format!("{} of {} rates rejected: inspect their issues", rejected, total));
        }

        let anomalies = result.anomaly_count();
        if total > 0 && anomalies as f64 / total as f64 > self.config.anomaly_ratio_threshold {
            recommendations.push(format!(
                "High anomaly count ({} of {}): investigate market conditions",
                anomalies, total
            ));
        }

        if !result.inconsistencies.is_empty() {
            recommendations.push(format!(
                "{} cross-rate inconsistencies: reconcile duplicate and inverse quotes",
                result.inconsistencies.len()
            ));
        }

        if !result.arbitrage.is_empty() {
            recommendations.push(format!(
                "{} triangular arbitrage opportunities: confirm quotes before acting",
                result.arbitrage.len()
            ));
        }

        let stale = result
            .rates
            .iter()
            .filter(|r| r.has_issue(IssueKind::StaleData))
            .count();
        if stale > 0 {
            recommendations.push(format!("{} stale rates: check provider feeds", stale));
        }

        let unreliable = self.reliability.below(self.config.min_reliability_score);
        if !unreliable.is_empty() {
            recommendations.push(format!(
                "{} providers below reliability threshold: {}",
                unreliable.len(),
                unreliable.join(", ")
            ));
        }

        recommendations
    }

    fn finish(&self, result: ValidationResult) -> ValidationResult {
        *self.last_quality.write() = Some(result.quality_score);

        info!(
            quality_score = result.quality_score,
            is_valid = result.is_valid,
            elapsed_us = result.elapsed.as_micros() as u64,
            rates = result.rates.len(),
            arbitrage = result.arbitrage.len(),
            inconsistencies = result.inconsistencies.len(),
            "Validation completed"
        );
        self.emit(ValidationEvent::ValidationCompleted {
            quality_score: result.quality_score,
            is_valid: result.is_valid,
            rate_count: result.rates.len(),
            arbitrage_count: result.arbitrage.len(),
            inconsistency_count: result.inconsistencies.len(),
        });

        result
    }

    fn emit(&self, event: ValidationEvent) {
        if self.events.send(event).is_err() {
            trace!("No validation event subscribers");
        }
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

fn hard_error(record: &RateRecord) -> Option<ValidationIssue> {
    if record.pair.is_degenerate() {
        return Some(ValidationIssue::error(
            IssueKind::InvalidPair,
            format!("Degenerate pair {}", record.pair),
        ));
    }

    let err = record.check().err()?;
    let kind = match &err {
        RateError::NonPositiveRate(_) => IssueKind::NonPositiveRate,
        RateError::NonPositiveBidAsk { .. } => IssueKind::NonPositiveBidAsk,
        RateError::InvertedQuote { .. } => IssueKind::InvertedSpread,
        RateError::InvalidPair(_) => IssueKind::InvalidPair,
    };
    Some(ValidationIssue::error(kind, err.to_string()))
}

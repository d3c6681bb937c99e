//! Structured validation outcomes.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fxrate_common::{Currency, CurrencyPair};
use rust_decimal::Decimal;
use serde::Serialize;

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    /// Hard rule violation; the rate is rejected.
    Error,
}

/// What an issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidPair,
    NonPositiveRate,
    NonPositiveBidAsk,
    InvertedSpread,
    InsufficientHistory,
    RangeDeviation,
    StaleData,
    WideSpread,
    InsufficientProviders,
    UnreliableProviders,
    Anomaly,
}

/// One finding against a rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub message: String,
    /// Points deducted from the quality score.
    pub penalty: f64,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: IssueSeverity::Error,
            message: message.into(),
            penalty: 100.0,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>, penalty: f64) -> Self {
        Self {
            kind,
            severity: IssueSeverity::Warning,
            message: message.into(),
            penalty,
        }
    }

    pub fn info(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: IssueSeverity::Info,
            message: message.into(),
            penalty: 0.0,
        }
    }
}

/// Outcome of validating one rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateValidation {
    pub pair: CurrencyPair,
    pub rate: Decimal,
    /// Score in `[0, 100]`.
    pub quality_score: f64,
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    /// Z-score against the pair's history, when enough history exists.
    pub z_score: Option<f64>,
    pub providers: Vec<String>,
}

impl RateValidation {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    pub fn is_anomaly(&self) -> bool {
        self.has_issue(IssueKind::Anomaly)
    }
}

/// A profitable round trip through three currencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    /// Conversion order; the cycle closes back to the first currency.
    pub path: [Currency; 3],
    /// Product of the three legs.
    pub product: Decimal,
    /// `(product - 1) * 10 000`.
    pub profit_bps: Decimal,
}

impl std::fmt::Display for ArbitrageOpportunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{}->{}->{} ({} bps)",
            self.path[0],
            self.path[1],
            self.path[2],
            self.path[0],
            self.profit_bps.round_dp(1)
        )
    }
}

/// Kind of cross-rate disagreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// Two quotes for the same pair disagree.
    Duplicate,
    /// `X/Y` and `1 / (Y/X)` disagree.
    Inverse,
}

/// Two quotes that should agree but do not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossRateInconsistency {
    pub kind: InconsistencyKind,
    pub pair: CurrencyPair,
    pub other: CurrencyPair,
    /// Rate of `pair` implied by `other`.
    pub expected: Decimal,
    pub actual: Decimal,
    /// Relative deviation of `actual` from `expected`.
    pub deviation: Decimal,
}

/// Outcome of validating a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Aggregate score in `[0, 100]`.
    pub quality_score: f64,
    pub rates: Vec<RateValidation>,
    pub arbitrage: Vec<ArbitrageOpportunity>,
    pub inconsistencies: Vec<CrossRateInconsistency>,
    /// Provider reliability after this run.
    pub provider_scores: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
    pub source: Option<String>,
    pub validated_at: DateTime<Utc>,
    /// Time spent validating the snapshot.
    pub elapsed: Duration,
}

impl ValidationResult {
    pub fn rejected(&self) -> impl Iterator<Item = &RateValidation> {
        self.rates.iter().filter(|r| !r.is_valid)
    }

    pub fn anomaly_count(&self) -> usize {
        self.rates.iter().filter(|r| r.is_anomaly()).count()
    }
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationEvent {
    AnomalyDetected {
        pair: CurrencyPair,
        rate: Decimal,
        z_score: f64,
        mean: f64,
        std_dev: f64,
    },
    ValidationCompleted {
        quality_score: f64,
        is_valid: bool,
        rate_count: usize,
        arbitrage_count: usize,
        inconsistency_count: usize,
    },
}

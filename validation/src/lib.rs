//! FxRate Validation
//!
//! Quality assurance for FX rate snapshots. Each rate is scored against
//! sanity rules, its pair's rolling history, freshness, spread and provider
//! reliability; the snapshot as a whole is checked for triangular arbitrage
//! and for duplicate or inverse quotes that disagree.
//!
//! Validation never fails: hard violations are reported as error-severity
//! issues so a batch always yields an outcome per rate.

pub mod config;
pub mod cross_rate;
pub mod engine;
pub mod history;
pub mod reliability;
pub mod result;

pub use config::ValidationConfig;
pub use cross_rate::{find_inconsistencies, find_triangular_arbitrage, QuoteBook};
pub use engine::{ValidationEngine, ValidationMetadata, ValidationStats};
pub use history::{RateHistoryWindow, RateObservation};
pub use reliability::{ProviderReliability, ReliabilityTracker};
pub use result::{
    ArbitrageOpportunity, CrossRateInconsistency, InconsistencyKind, IssueKind, IssueSeverity,
    RateValidation, ValidationEvent, ValidationIssue, ValidationResult,
};

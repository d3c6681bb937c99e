//! Cache error types.

use std::time::Duration;

use fxrate_common::{CurrencyPair, RateError};
use thiserror::Error;

/// Errors that can occur in the rate cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Distributed store unreachable.
    #[error("Distributed store unavailable: {0}")]
    Connectivity(String),

    /// Distributed store call exceeded its deadline.
    #[error("Store operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Corrupt or unparseable cached value.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Rate record violates its invariants and was not cached.
    #[error("Invalid rate for {pair}: {source}")]
    InvalidRate {
        pair: CurrencyPair,
        #[source]
        source: RateError,
    },

    /// Alert configuration rejected.
    #[error("Invalid alert for {pair}: {reason}")]
    InvalidAlert { pair: CurrencyPair, reason: String },

    /// Reconnection gave up; operator intervention required.
    #[error("Max reconnect attempts ({attempts}) exceeded")]
    MaxReconnectExceeded { attempts: u32 },

    /// Store rejected a command for a non-connectivity reason.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Whether this error means the store could not be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            CacheError::Connectivity(_)
                | CacheError::Timeout { .. }
                | CacheError::MaxReconnectExceeded { .. }
        )
    }

    /// Get error code for logs and health reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            CacheError::Connectivity(_) => "CONNECTIVITY",
            CacheError::Timeout { .. } => "TIMEOUT",
            CacheError::Serialization(_) => "SERIALIZATION",
            CacheError::InvalidRate { .. } => "INVALID_RATE",
            CacheError::InvalidAlert { .. } => "INVALID_ALERT",
            CacheError::MaxReconnectExceeded { .. } => "MAX_RECONNECT_EXCEEDED",
            CacheError::Store(_) => "STORE_ERROR",
            CacheError::Config(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

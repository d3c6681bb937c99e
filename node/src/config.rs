//! Node configuration.

use std::str::FromStr;
use std::time::Duration;

use fxrate_cache::CacheConfig;
use fxrate_validation::ValidationConfig;

/// Full node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Node identifier (auto-generated if not set).
    pub node_id: Option<String>,
    /// Redis URL; the in-memory store is used when unset.
    pub redis_url: Option<String>,
    /// Interval between health checks.
    pub health_interval: Duration,
    /// Interval between validations of the L1 snapshot.
    pub validation_interval: Duration,
    /// Emit JSON logs.
    pub log_json: bool,
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Validation configuration.
    pub validation: ValidationConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            redis_url: None,
            health_interval: Duration::from_secs(30),
            validation_interval: Duration::from_secs(60),
            log_json: false,
            cache: CacheConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl NodeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            cache: CacheConfig::from_env(),
            validation: ValidationConfig::from_env(),
            ..Self::default()
        };

        if let Ok(id) = std::env::var("FX_NODE_ID") {
            config.node_id = Some(id);
        }

        if let Ok(url) = std::env::var("FX_REDIS_URL") {
            config.redis_url = Some(url).filter(|u| !u.is_empty());
        }

        if let Some(secs) = env_parse::<u64>("FX_NODE_HEALTH_INTERVAL_SECS") {
            config.health_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("FX_NODE_VALIDATION_INTERVAL_SECS") {
            config.validation_interval = Duration::from_secs(secs);
        }

        if let Some(json) = env_parse("FX_NODE_LOG_JSON") {
            config.log_json = json;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.health_interval.is_zero() || self.validation_interval.is_zero() {
            return Err("Task intervals must be non-zero".to_string());
        }

        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(format!("Unsupported store URL: {}", url));
            }
        }

        self.cache.validate()?;
        self.validation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let config = NodeConfig {
            redis_url: Some("http://localhost:6379".to_string()),
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NodeConfig {
            validation_interval: Duration::ZERO,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.cache.l1_capacity = 0;
        assert!(config.validate().is_err());
    }
}

//! FxRate Node
//!
//! Runs one rate cache instance: connects the distributed store, keeps L1 in
//! step with peer instances, and periodically health-checks the cache and
//! validates the rates it holds.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fxrate_cache::{CacheEvent, DistributedStore, MemoryStore, RateCache, SetOptions};
use fxrate_common::{CurrencyPair, RateRecord};
use fxrate_validation::{ValidationEngine, ValidationMetadata};
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::NodeConfig;

/// FxRate node CLI
#[derive(Parser, Debug)]
#[command(name = "fxrate-node")]
#[command(about = "FX rate cache node with periodic validation")]
struct Args {
    /// Redis URL (overrides FX_REDIS_URL)
    #[arg(long)]
    redis_url: Option<String>,

    /// Use the in-process store even if a Redis URL is configured
    #[arg(long)]
    memory: bool,

    /// Node identifier (overrides FX_NODE_ID)
    #[arg(long)]
    node_id: Option<String>,

    /// Seconds between health checks
    #[arg(long)]
    health_interval: Option<u64>,

    /// Seconds between snapshot validations
    #[arg(long)]
    validation_interval: Option<u64>,

    /// Emit JSON logs
    #[arg(long)]
    log_json: bool,

    /// Seed a few sample rates at startup
    #[arg(long)]
    seed_demo: bool,
}

impl Args {
    fn apply(&self, config: &mut NodeConfig) {
        if let Some(url) = &self.redis_url {
            config.redis_url = Some(url.clone());
        }
        if self.memory {
            config.redis_url = None;
        }
        if let Some(id) = &self.node_id {
            config.node_id = Some(id.clone());
        }
        if let Some(secs) = self.health_interval {
            config.health_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.validation_interval {
            config.validation_interval = Duration::from_secs(secs);
        }
        if self.log_json {
            config.log_json = true;
        }
    }
}

fn init_logging(json: bool) {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    ));

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_store(config: &NodeConfig) -> anyhow::Result<Arc<dyn DistributedStore>> {
    match &config.redis_url {
        #[cfg(feature = "redis-store")]
        Some(url) => Ok(Arc::new(fxrate_cache::RedisStore::new(url)?)),
        #[cfg(not(feature = "redis-store"))]
        Some(_) => Err(anyhow::anyhow!("Built without Redis support")),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

fn spawn_event_logger(cache: &RateCache) -> JoinHandle<()> {
    let mut events = cache.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(CacheEvent::AlertTriggered(alert)) => info!(
                    pair = %alert.pair,
                    rate = %alert.current_rate,
                    threshold = %alert.threshold,
                    direction = %alert.direction,
                    "Alert"
                ),
                Ok(CacheEvent::Disconnected { reason }) => warn!(reason = %reason, "Store disconnected"),
                Ok(CacheEvent::Reconnecting { attempt, delay }) => {
                    info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting to store")
                }
                Ok(CacheEvent::Reconnected { attempts }) => info!(attempts, "Store reconnected"),
                Ok(CacheEvent::MaxReconnectAttemptsExceeded { attempts }) => {
                    error!(attempts, "Store reconnection abandoned; restart or reconnect manually")
                }
                Ok(event) => debug!(event = ?event, "Cache event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn seed_demo_rates(cache: &RateCache) -> anyhow::Result<()> {
    let quotes = [
        ("USD", "EUR", Decimal::new(9215, 4)),
        ("EUR", "GBP", Decimal::new(8560, 4)),
        ("GBP", "USD", Decimal::new(12680, 4)),
        ("USD", "JPY", Decimal::new(14950, 2)),
    ];

    let records = quotes
        .iter()
        .map(|(base, quote, rate)| {
            RateRecord::new(CurrencyPair::new(*base, *quote), *rate).with_providers(["demo-a", "demo-b"])
        })
        .collect();

    let count = cache.set_rates(records, SetOptions::default()).await?;
    info!(count, "Seeded demo rates");
    Ok(())
}

fn validate_snapshot(cache: &RateCache, engine: &ValidationEngine, node_id: &str) {
    let snapshot = cache.snapshot();
    if snapshot.is_empty() {
        debug!("No cached rates to validate");
        return;
    }

    let metadata = ValidationMetadata {
        source: Some(node_id.to_string()),
        ..Default::default()
    };
    let result = engine.validate_rates(&snapshot, &metadata);

    for rate in result.rejected() {
        warn!(
            pair = %rate.pair,
            rate = %rate.rate,
            quality_score = rate.quality_score,
            issues = ?rate.issues.iter().map(|i| i.kind).collect::<Vec<_>>(),
            "Cached rate failed validation"
        );
    }
    for recommendation in &result.recommendations {
        info!(recommendation = %recommendation, "Validation recommendation");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = NodeConfig::from_env();
    args.apply(&mut config);

    init_logging(config.log_json);

    info!("Starting FxRate node");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let node_id = config
        .node_id
        .clone()
        .unwrap_or_else(|| format!("fxrate-{}", uuid::Uuid::new_v4()));
    info!(node_id = %node_id, "Node ID assigned");

    let store = build_store(&config)?;
    let cache = Arc::new(RateCache::new(store, config.cache.clone()).with_instance_id(node_id.clone()));
    let engine = ValidationEngine::new(config.validation.clone());

    cache.connect().await?;
    let logger = spawn_event_logger(&cache);
    let listener = cache.start_invalidation_listener().await?;

    if args.seed_demo {
        seed_demo_rates(&cache).await?;
    }

    let cache_info = cache.cache_info().await;
    info!(
        node_id = %node_id,
        store = %cache_info.store,
        health_interval_secs = config.health_interval.as_secs(),
        validation_interval_secs = config.validation_interval.as_secs(),
        "Node running"
    );

    let mut health = tokio::time::interval(config.health_interval);
    let mut validation = tokio::time::interval(config.validation_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown signal received");
                break;
            }
            _ = health.tick() => {
                let report = cache.health_check().await;
                info!(
                    status = ?report.status,
                    latency_ms = report.latency_ms,
                    l1_entries = report.l1_entries,
                    error_rate = report.error_rate,
                    "Health check"
                );
            }
            _ = validation.tick() => validate_snapshot(&cache, &engine, &node_id),
        }
    }

    listener.abort();
    logger.abort();

    let stats = cache.stats();
    info!(
        hit_rate = stats.hit_rate(),
        sets = stats.sets,
        errors = stats.errors,
        "Node shutdown complete"
    );
    Ok(())
}

//! FxRate Cache
//!
//! A two-tier cache for FX rates. L1 is a bounded in-process map; L2 is a
//! distributed store (Redis in production, [`MemoryStore`] for tests and
//! single-node runs) shared by every instance. Writes publish update messages
//! so peer instances drop their L1 copies, and per-pair alerts fire when a
//! written rate crosses a threshold.
//!
//! ```ignore
//! let cache = RateCache::new(Arc::new(MemoryStore::new()), CacheConfig::default());
//! cache.set_rate(record, SetOptions::default()).await?;
//! let hit = cache.get_rate(&pair, GetOptions::default()).await;
//! ```

pub mod alerts;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod health;
pub mod l1;
pub mod l2;
pub mod reconnect;
pub mod service;
pub mod stats;
pub mod store;

pub use alerts::{AlertConfig, AlertDirection, AlertManager, AlertOptions};
pub use codec::RateCodec;
pub use config::{CacheConfig, CompressionAlgorithm};
pub use entry::CacheEntry;
pub use error::{CacheError, CacheResult};
pub use events::{AlertMessage, CacheEvent, EventBus, UpdateMessage};
pub use health::{CacheInfo, HealthReport, HealthStatus};
pub use reconnect::{ConnectionState, ReconnectPolicy};
pub use service::{CacheTier, CachedRate, ClearReport, ClearScope, GetOptions, RateCache, SetOptions};
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::{DistributedStore, MemoryStore, StoreMessage};

#[cfg(feature = "redis-store")]
pub use store::RedisStore;

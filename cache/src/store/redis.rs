//! Redis-backed distributed store.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::{ttl_seconds, DistributedStore, StoreMessage};
use crate::error::{CacheError, CacheResult};

fn map_error(e: RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        CacheError::Connectivity(e.to_string())
    } else {
        CacheError::Store(e.to_string())
    }
}

/// Store backed by a Redis server.
///
/// A single multiplexed connection is shared by all callers. It is dropped on
/// connectivity errors and re-established lazily, so the reconnect loop's
/// `ping` is what brings the store back.
pub struct RedisStore {
    client: Client,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    /// Create a store for `url` without connecting yet.
    pub fn new(url: &str) -> CacheResult<Self> {
        let client = Client::open(url).map_err(|e| CacheError::Config(e.to_string()))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_error)?;
        info!("Connected to Redis");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn run<T>(&self, cmd: &redis::Cmd) -> CacheResult<T>
    where
        T: redis::FromRedisValue,
    {
        let mut conn = self.connection().await?;
        match cmd.query_async::<_, T>(&mut conn).await {
            Ok(value) => Ok(value),
            Err(e) => Err(self.on_error(e).await),
        }
    }

    async fn on_error(&self, e: RedisError) -> CacheError {
        let err = map_error(e);
        if err.is_connectivity() {
            *self.conn.lock().await = None;
        }
        err
    }
}

#[async_trait]
impl DistributedStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.run(redis::cmd("GET").arg(key)).await
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.run(
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_seconds(ttl)),
        )
        .await
    }

    async fn set_many_ex(&self, entries: Vec<(String, String, Duration)>) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value, ttl) in entries {
            pipe.cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_seconds(ttl))
                .ignore();
        }

        let mut conn = self.connection().await?;
        match pipe.query_async::<_, ()>(&mut conn).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error(e).await),
        }
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.run(redis::cmd("DEL").arg(keys)).await
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.run(redis::cmd("KEYS").arg(pattern)).await
    }

    async fn publish(&self, channel: &str, message: String) -> CacheResult<u64> {
        self.run(redis::cmd("PUBLISH").arg(channel).arg(message))
            .await
    }

    async fn subscribe(&self, channels: &[String]) -> CacheResult<mpsc::Receiver<StoreMessage>> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(map_error)?;
        for channel in channels {
            pubsub.subscribe(channel).await.map_err(map_error)?;
        }

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Dropping non-text pub/sub payload");
                        continue;
                    }
                };
                let message = StoreMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                };
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            debug!("Redis subscription closed");
        });

        Ok(rx)
    }

    async fn ping(&self) -> CacheResult<()> {
        let _: String = self.run(&redis::cmd("PING")).await?;
        Ok(())
    }

    async fn configure_eviction(&self, max_memory: Option<&str>, policy: &str) -> CacheResult<()> {
        if let Some(max_memory) = max_memory {
            let _: () = self
                .run(redis::cmd("CONFIG").arg("SET").arg("maxmemory").arg(max_memory))
                .await?;
        }
        let _: () = self
            .run(
                redis::cmd("CONFIG")
                    .arg("SET")
                    .arg("maxmemory-policy")
                    .arg(policy),
            )
            .await?;
        info!(policy, "Configured Redis eviction policy");
        Ok(())
    }
}

//! Local event bus and the JSON messages published on store channels.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fxrate_common::CurrencyPair;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::alerts::AlertDirection;

/// Message published on the rate-updates channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateMessage {
    /// A single pair was written.
    Rate {
        pair: String,
        rate: Decimal,
        timestamp: DateTime<Utc>,
        source: String,
    },
    /// A batch of pairs was written in one pipeline.
    Batch {
        pairs: Vec<String>,
        count: usize,
        timestamp: DateTime<Utc>,
        source: String,
    },
}

impl UpdateMessage {
    /// Instance that published the message.
    pub fn source(&self) -> &str {
        match self {
            UpdateMessage::Rate { source, .. } | UpdateMessage::Batch { source, .. } => source,
        }
    }

    /// Pair keys touched by the update.
    pub fn pair_keys(&self) -> Vec<&str> {
        match self {
            UpdateMessage::Rate { pair, .. } => vec![pair.as_str()],
            UpdateMessage::Batch { pairs, .. } => pairs.iter().map(String::as_str).collect(),
        }
    }
}

/// Message published on the rate-alerts channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    pub pair: String,
    pub current_rate: Decimal,
    pub threshold: Decimal,
    pub direction: AlertDirection,
    pub timestamp: DateTime<Utc>,
    pub trigger_count: u64,
}

/// Events delivered to in-process subscribers.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A single rate was written to both tiers.
    RateUpdated {
        pair: CurrencyPair,
        rate: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// A batch of rates was written to both tiers.
    BatchUpdated { pairs: Vec<CurrencyPair> },
    /// An alert threshold fired.
    AlertTriggered(AlertMessage),
    /// L1 dropped its oldest entry to make room.
    Evicted { pair_key: String },
    /// Another instance updated a pair; the local L1 copy was dropped.
    Invalidated { pair_key: String, source: String },
    /// The distributed store became unreachable.
    Disconnected { reason: String },
    /// A reconnection attempt is scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// The store is reachable again.
    Reconnected { attempts: u32 },
    /// Reconnection gave up.
    MaxReconnectAttemptsExceeded { attempts: u32 },
}

/// Broadcast fan-out for [`CacheEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CacheEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver an event; dropped silently when nobody listens.
    pub fn emit(&self, event: CacheEvent) {
        if self.tx.send(event).is_err() {
            trace!("No cache event subscribers");
        }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.tx.subscribe()
    }
}

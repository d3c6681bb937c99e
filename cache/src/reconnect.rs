//! Connection tracking and exponential-backoff reconnection for the L2 store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{CacheError, CacheResult};
use crate::events::{CacheEvent, EventBus};
use crate::store::DistributedStore;

/// Backoff schedule for reconnection attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(3),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Validate the policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("Max reconnect attempts must be at least 1".to_string());
        }
        if self.base_delay > self.max_delay {
            return Err("Reconnect base delay cannot exceed max delay".to_string());
        }
        Ok(())
    }
}

/// Reachability of the distributed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Calls go through.
    Connected,
    /// A failure was observed; reconnection is pending.
    Disconnected,
    /// Reconnection attempt in progress.
    Reconnecting { attempt: u32 },
    /// Reconnection gave up.
    Failed { attempts: u32 },
}

impl ConnectionState {
    /// Check if store calls should be attempted.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if automatic recovery has stopped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed { .. })
    }
}

/// Tracks store reachability and drives reconnection.
pub struct ConnectionMonitor {
    store: Arc<dyn DistributedStore>,
    policy: ReconnectPolicy,
    timeout: Duration,
    state: RwLock<ConnectionState>,
    reconnecting: AtomicBool,
    bus: EventBus,
}

impl ConnectionMonitor {
    /// Create a monitor that assumes the store is reachable.
    pub fn new(
        store: Arc<dyn DistributedStore>,
        policy: ReconnectPolicy,
        timeout: Duration,
        bus: EventBus,
    ) -> Self {
        Self {
            store,
            policy,
            timeout,
            state: RwLock::new(ConnectionState::Connected),
            reconnecting: AtomicBool::new(false),
            bus,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Error to fail fast with while the store is not reachable.
    pub fn unavailable(&self) -> Option<CacheError> {
        match self.state() {
            ConnectionState::Connected => None,
            ConnectionState::Failed { attempts } => {
                Some(CacheError::MaxReconnectExceeded { attempts })
            }
            ConnectionState::Disconnected | ConnectionState::Reconnecting { .. } => Some(
                CacheError::Connectivity(format!("{} store reconnecting", self.store.name())),
            ),
        }
    }

    /// Record a connectivity failure and start reconnecting if needed.
    pub fn connection_lost(self: &Arc<Self>, reason: &str) {
        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Failed { .. } => return,
                ConnectionState::Connected => {
                    *state = ConnectionState::Disconnected;
                    warn!(store = self.store.name(), reason, "Distributed store connection lost");
                    self.bus.emit(CacheEvent::Disconnected {
                        reason: reason.to_string(),
                    });
                }
                _ => {}
            }
        }

        if self.reconnecting.swap(true, Ordering::SeqCst) {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(Arc::clone(self).reconnect_loop());
            }
            Err(_) => {
                self.reconnecting.store(false, Ordering::SeqCst);
                warn!("No async runtime available; reconnection deferred");
            }
        }
    }

    /// Ping the store immediately, resetting a failed connection on success.
    pub async fn reconnect_now(&self) -> CacheResult<()> {
        match tokio::time::timeout(self.timeout, self.store.ping()).await {
            Ok(Ok(())) => {
                let previous = std::mem::replace(&mut *self.state.write(), ConnectionState::Connected);
                if !previous.is_connected() {
                    info!(store = self.store.name(), "Distributed store connection restored");
                    self.bus.emit(CacheEvent::Reconnected { attempts: 0 });
                }
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CacheError::Timeout {
                operation: "ping",
                after: self.timeout,
            }),
        }
    }

    async fn reconnect_loop(self: Arc<Self>) {
        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay_for(attempt);
            *self.state.write() = ConnectionState::Reconnecting { attempt };
            self.bus.emit(CacheEvent::Reconnecting { attempt, delay });
            tokio::time::sleep(delay).await;

            match tokio::time::timeout(self.timeout, self.store.ping()).await {
                Ok(Ok(())) => {
                    *self.state.write() = ConnectionState::Connected;
                    self.reconnecting.store(false, Ordering::SeqCst);
                    info!(store = self.store.name(), attempt, "Reconnected to distributed store");
                    self.bus.emit(CacheEvent::Reconnected { attempts: attempt });
                    return;
                }
                Ok(Err(e)) => debug!(attempt, error = %e, "Reconnect attempt failed"),
                Err(_) => debug!(attempt, "Reconnect attempt timed out"),
            }
        }

        let attempts = self.policy.max_attempts;
        *self.state.write() = ConnectionState::Failed { attempts };
        self.reconnecting.store(false, Ordering::SeqCst);
        error!(
            store = self.store.name(),
            attempts, "Max reconnect attempts exceeded; operator action required"
        );
        self.bus.emit(CacheEvent::MaxReconnectAttemptsExceeded { attempts });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            max_attempts,
        }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(6), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_reconnects_when_store_returns() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(64);
        let mut events = bus.subscribe();
        let monitor = Arc::new(ConnectionMonitor::new(
            store.clone(),
            fast_policy(20),
            Duration::from_millis(50),
            bus,
        ));

        store.set_online(false);
        monitor.connection_lost("test outage");
        assert!(monitor.unavailable().is_some());
        assert!(matches!(events.recv().await, Ok(CacheEvent::Disconnected { .. })));

        store.set_online(true);
        loop {
            match events.recv().await.unwrap() {
                CacheEvent::Reconnected { .. } => break,
                CacheEvent::Reconnecting { .. } => continue,
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(monitor.state(), ConnectionState::Connected);
        assert!(monitor.unavailable().is_none());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(64);
        let mut events = bus.subscribe();
        let monitor = Arc::new(ConnectionMonitor::new(
            store.clone(),
            fast_policy(3),
            Duration::from_millis(50),
            bus,
        ));

        store.set_online(false);
        monitor.connection_lost("test outage");

        loop {
            if let CacheEvent::MaxReconnectAttemptsExceeded { attempts } = events.recv().await.unwrap() {
                assert_eq!(attempts, 3);
                break;
            }
        }
        assert!(monitor.state().is_terminal());
        assert!(matches!(
            monitor.unavailable(),
            Some(CacheError::MaxReconnectExceeded { attempts: 3 })
        ));

        // No automatic recovery; the operator resets it.
        store.set_online(true);
        monitor.connection_lost("still down");
        assert!(monitor.state().is_terminal());
        monitor.reconnect_now().await.unwrap();
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }
}

//! Registry and fan-out configuration

use std::time::Duration;

use super::history::{BackfillPolicy, DEFAULT_HISTORY_CAPACITY};
use crate::delivery::DeliveryPolicy;

/// Configuration for the session registry and the hub built on it
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each session's outbound queue
    pub queue_capacity: usize,

    /// Maximum concurrent sessions (0 = unlimited)
    pub max_sessions: usize,

    /// Number of recently published readings kept for backfill
    pub history_capacity: usize,

    /// What a newly registered session receives before live data
    pub backfill: BackfillPolicy,

    /// Retry behaviour of delivery workers
    pub delivery: DeliveryPolicy,

    /// Sessions still `Connecting` after this long are swept
    pub handshake_timeout: Duration,

    /// How often the cleanup task runs
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_sessions: 0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            backfill: BackfillPolicy::None,
            delivery: DeliveryPolicy::default(),
            handshake_timeout: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// Set the per-session queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set maximum concurrent sessions
    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the recent-history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the backfill policy
    pub fn backfill(mut self, policy: BackfillPolicy) -> Self {
        self.backfill = policy;
        self
    }

    /// Set the delivery retry policy
    pub fn delivery(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery = policy;
        self
    }

    /// Set the handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

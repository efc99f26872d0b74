//! Delivery retry policy

use std::time::Duration;

/// How a worker retries a failed transport write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Consecutive failed writes of one frame before the session is torn down
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

impl DeliveryPolicy {
    /// Set the attempt limit (minimum 1)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the backoff between attempts
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

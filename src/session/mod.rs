//! Subscriber sessions
//!
//! A [`Session`] is one logical subscriber, independent of the transport it
//! is connected over. It is owned by the
//! [`SessionRegistry`](crate::registry::SessionRegistry) and shared with the
//! hub (producer side of the queue) and its own delivery worker (consumer).

pub mod queue;
pub mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::registry::ReadingFrame;
use crate::stats::SessionStats;

pub use queue::{OutboundQueue, PushOutcome};
pub use state::SessionState;

/// Unique session identifier, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s-{}", self.0)
    }
}

/// One connected subscriber
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
    queue: OutboundQueue,
    connected_at: Instant,
    last_seen: Mutex<Instant>,
    delivered: AtomicU64,
    retries: AtomicU64,
}

impl Session {
    /// Create a session in `Connecting`
    pub(crate) fn new(id: SessionId, queue_capacity: usize) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: Mutex::new(SessionState::Connecting),
            queue: OutboundQueue::new(queue_capacity),
            connected_at: now,
            last_seen: Mutex::new(now),
            delivered: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Whether the session has reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    fn transition(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if state.can_transition_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }

    /// Connecting → Active
    pub(crate) fn activate(&self) -> bool {
        self.transition(SessionState::Active)
    }

    /// Active → Draining; wakes the worker so it can flush and exit
    pub(crate) fn begin_draining(&self) -> bool {
        let changed = self.transition(SessionState::Draining);
        if changed {
            self.queue.wake();
        }
        changed
    }

    /// Any live state → Closed; discards the queue and wakes the worker
    ///
    /// Returns the number of discarded frames, or `None` if the session was
    /// already closed.
    pub(crate) fn close(&self) -> Option<usize> {
        if !self.transition(SessionState::Closed) {
            return None;
        }
        Some(self.queue.close())
    }

    /// Queue a frame for delivery
    pub fn enqueue(&self, frame: ReadingFrame) -> PushOutcome {
        self.queue.push(frame)
    }

    /// Outbound queue
    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// Record a successful transport write
    pub(crate) fn mark_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Record a failed attempt that will be retried
    pub(crate) fn mark_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since connect
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Time since the last successful write (or connect)
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Frames written to the transport
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Snapshot statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id.get(),
            state: self.state(),
            queued: self.queue.len(),
            delivered: self.delivered(),
            dropped: self.queue.dropped(),
            retries: self.retries.load(Ordering::Relaxed),
            connected_secs: self.age().as_secs(),
            idle_ms: self.idle_for().as_millis() as u64,
        }
    }
}

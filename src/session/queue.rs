//! Bounded per-session outbound queue
//!
//! Many publishers push, exactly one delivery worker pops. When the queue is
//! full the oldest frame is evicted: for live telemetry a fresh reading is
//! worth more than a stale one.
//!
//! Wake-ups go through [`tokio::sync::Notify::notify_one`], which stores a
//! permit when the worker is not currently waiting, so a push racing with the
//! worker's emptiness check is never lost.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::registry::ReadingFrame;

/// Result of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended with room to spare
    Queued,
    /// Appended after evicting the oldest frame
    DroppedOldest,
    /// Queue is closed; nothing was stored
    Refused,
}

#[derive(Debug)]
struct QueueInner {
    items: VecDeque<ReadingFrame>,
    closed: bool,
}

/// Bounded FIFO feeding one delivery worker
#[derive(Debug)]
pub struct OutboundQueue {
    inner: Mutex<QueueInner>,
    capacity: usize,
    dropped: AtomicU64,
    notify: Notify,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` frames (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Append a frame, evicting the oldest one if full
    pub fn push(&self, frame: ReadingFrame) -> PushOutcome {
        let outcome = {
            let mut inner = self.inner.lock();

            if inner.closed {
                return PushOutcome::Refused;
            }

            let outcome = if inner.items.len() >= self.capacity {
                inner.items.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                PushOutcome::DroppedOldest
            } else {
                PushOutcome::Queued
            };

            inner.items.push_back(frame);
            outcome
        };

        self.notify.notify_one();
        outcome
    }

    /// Remove the oldest frame
    pub fn pop(&self) -> Option<ReadingFrame> {
        self.inner.lock().items.pop_front()
    }

    /// Wait until something changes (push, close, or an explicit wake)
    pub async fn notified(&self) {
        self.notify.notified().await
    }

    /// Wake the consumer without pushing
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    /// Refuse further pushes and discard queued frames
    ///
    /// Returns the number of frames discarded.
    pub fn close(&self) -> usize {
        let discarded = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            let n = inner.items.len();
            inner.items.clear();
            n
        };

        self.notify.notify_one();
        discarded
    }

    /// Whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames evicted by overflow so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Sequence numbers currently queued, oldest first
    pub fn sequences(&self) -> Vec<u64> {
        self.inner.lock().items.iter().map(|f| f.sequence).collect()
    }
}

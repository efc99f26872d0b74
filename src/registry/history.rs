//! Recent-history ring buffer for reconnecting subscribers
//!
//! When a subscriber (re)connects it has missed everything published while it
//! was away. The hub keeps the last few frames here and, depending on the
//! configured [`BackfillPolicy`], seeds the new session's queue from them
//! before live delivery starts.
//!
//! The buffer is written on every publish and read only at registration.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::frame::ReadingFrame;

/// Default number of frames retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// What a newly registered session receives before live data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackfillPolicy {
    /// Nothing until the next publish
    #[default]
    None,
    /// The N most recent readings of every device present in history
    LastN(usize),
    /// Every reading published within the window
    BufferWindow(Duration),
}

/// Bounded buffer of the most recently published frames
#[derive(Debug)]
pub struct RecentHistory {
    /// Maximum number of frames
    capacity: usize,
    /// Frames, oldest first
    frames: VecDeque<ReadingFrame>,
    /// Total frames ever pushed
    total_pushed: u64,
}

impl RecentHistory {
    /// Create a buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a buffer holding at most `capacity` frames
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
            total_pushed: 0,
        }
    }

    /// Append a frame, evicting the oldest when full
    pub fn push(&mut self, frame: ReadingFrame) {
        self.total_pushed += 1;

        if self.capacity == 0 {
            return;
        }

        while self.frames.len() >= self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Select backfill frames for a new session, oldest first
    pub fn backfill(&self, policy: BackfillPolicy) -> Vec<ReadingFrame> {
        self.backfill_at(policy, Instant::now())
    }

    fn backfill_at(&self, policy: BackfillPolicy, now: Instant) -> Vec<ReadingFrame> {
        match policy {
            BackfillPolicy::None => Vec::new(),
            BackfillPolicy::LastN(0) => Vec::new(),
            BackfillPolicy::LastN(n) => {
                // Walk newest to oldest, keep up to n per device, then restore order
                let mut per_device: HashMap<&str, usize> = HashMap::new();
                let mut selected: Vec<ReadingFrame> = Vec::new();

                for frame in self.frames.iter().rev() {
                    let count = per_device.entry(frame.device_id()).or_insert(0);
                    if *count < n {
                        *count += 1;
                        selected.push(frame.clone());
                    }
                }

                selected.reverse();
                selected
            }
            BackfillPolicy::BufferWindow(window) => self
                .frames
                .iter()
                .filter(|frame| now.saturating_duration_since(frame.published_at) <= window)
                .cloned()
                .collect(),
        }
    }

    /// Number of frames currently held
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the buffer holds nothing
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total frames ever pushed, including evicted ones
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }
}

impl Default for RecentHistory {
    fn default() -> Self {
        Self::new()
    }
}

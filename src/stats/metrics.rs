//! Statistics for sessions and the hub

use serde::Serialize;

use crate::session::SessionState;

/// Session-level statistics
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Session id
    pub session_id: u64,
    /// Lifecycle state
    pub state: SessionState,
    /// Frames waiting in the outbound queue
    pub queued: usize,
    /// Frames written to the transport
    pub delivered: u64,
    /// Frames evicted by queue overflow
    pub dropped: u64,
    /// Failed writes that were retried
    pub retries: u64,
    /// Seconds since connect
    pub connected_secs: u64,
    /// Milliseconds since the last successful write (or connect)
    pub idle_ms: u64,
}

/// Hub-wide statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct HubStats {
    /// Sessions currently eligible for fan-out
    pub active_sessions: usize,
    /// Sessions in any live state
    pub registered_sessions: usize,
    /// Sessions ever registered
    pub total_sessions: u64,
    /// Readings accepted by `publish`
    pub readings_published: u64,
    /// Frames enqueued across all sessions
    pub frames_enqueued: u64,
    /// Frames evicted by overflow across live sessions
    pub frames_dropped: u64,
    /// Sessions torn down after exhausting delivery retries
    pub sessions_failed: u64,
    /// Frames currently retained for backfill
    pub history_len: usize,
    /// Seconds since the hub was created
    pub uptime_secs: u64,
}

impl HubStats {
    /// Average fan-out per published reading
    pub fn fanout_ratio(&self) -> f64 {
        if self.readings_published > 0 {
            self.frames_enqueued as f64 / self.readings_published as f64
        } else {
            0.0
        }
    }
}

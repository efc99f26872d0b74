//! Session state machine
//!
//! Tracks a subscriber session from transport connect to teardown.
//!
//! ```text
//! Connecting ──► Active ──► Draining ──► Closed
//!      │            │                      ▲
//!      └────────────┴──────────────────────┘
//! ```

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Registered, transport handshake / backfill not finished
    Connecting,
    /// Eligible for fan-out
    Active,
    /// No new readings; worker flushes what is queued, then closes
    Draining,
    /// Terminal; removed from the registry
    Closed,
}

impl SessionState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Connecting, Active)
                | (Connecting, Closed)
                | (Active, Draining)
                | (Active, Closed)
                | (Draining, Closed)
        )
    }

    /// Whether fan-out should target a session in this state
    pub fn accepts_publish(self) -> bool {
        self == SessionState::Active
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

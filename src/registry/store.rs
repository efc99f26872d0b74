//! Session registry implementation
//!
//! The single shared map of connected subscribers. Registration and removal
//! take the write lock; fan-out takes the read lock just long enough to copy
//! out the `Arc`s of the active sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::error::RegistryError;
use crate::session::{Session, SessionId, SessionState};
use crate::stats::SessionStats;

/// Registry of all live sessions
///
/// Thread-safe via `RwLock`. Fan-out snapshots vastly outnumber
/// connects/disconnects, so they share the read side.
pub struct SessionRegistry {
    /// Map of session id to session
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,

    /// Next id to hand out
    next_id: AtomicU64,

    /// Sessions ever registered
    registered_total: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl SessionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            registered_total: AtomicU64::new(0),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new session in `Connecting`
    ///
    /// Fails if `max_sessions` is set and reached.
    pub async fn register(&self) -> Result<Arc<Session>, RegistryError> {
        let mut sessions = self.sessions.write().await;

        if self.config.max_sessions > 0 && sessions.len() >= self.config.max_sessions {
            tracing::warn!(
                max_sessions = self.config.max_sessions,
                "Session rejected: limit reached"
            );
            return Err(RegistryError::SessionLimit(self.config.max_sessions));
        }

        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Arc::new(Session::new(id, self.config.queue_capacity));
        sessions.insert(id, Arc::clone(&session));
        self.registered_total.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(session_id = %id, sessions = sessions.len(), "Session registered");

        Ok(session)
    }

    /// Mark a session's handshake complete (Connecting → Active)
    ///
    /// Returns false if the session is unknown or not `Connecting`.
    pub async fn activate(&self, id: SessionId) -> bool {
        let sessions = self.sessions.read().await;

        match sessions.get(&id) {
            Some(session) => {
                let activated = session.activate();
                if activated {
                    tracing::info!(
                        session_id = %id,
                        sessions = sessions.len(),
                        queued = session.queue().len(),
                        "Session active"
                    );
                }
                activated
            }
            None => false,
        }
    }

    /// Remove a session and discard its queue
    ///
    /// Idempotent: unknown or already removed ids are a no-op. Returns
    /// whether this call removed the session.
    pub async fn unregister(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;

        let Some(session) = sessions.remove(&id) else {
            return false;
        };

        let discarded = session.close().unwrap_or(0);

        tracing::info!(
            session_id = %id,
            discarded = discarded,
            delivered = session.delivered(),
            dropped = session.queue().dropped(),
            sessions = sessions.len(),
            "Session closed"
        );

        true
    }

    /// Snapshot of the sessions eligible for fan-out
    pub async fn lookup_active(&self) -> Vec<Arc<Session>> {
        let sessions = self.sessions.read().await;

        sessions
            .values()
            .filter(|s| s.state().accepts_publish())
            .cloned()
            .collect()
    }

    /// Look up a session by id
    pub async fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Number of registered sessions (any live state)
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are registered
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Sessions ever registered
    pub fn registered_total(&self) -> u64 {
        self.registered_total.load(Ordering::Relaxed)
    }

    /// Move every active session to `Draining`
    ///
    /// Workers flush what is already queued and then unregister themselves.
    pub async fn drain_all(&self) -> usize {
        let sessions = self.sessions.read().await;

        let drained = sessions.values().filter(|s| s.begin_draining()).count();

        tracing::info!(sessions = drained, "Draining sessions");
        drained
    }

    /// Per-session statistics
    pub async fn session_stats(&self) -> Vec<SessionStats> {
        let sessions = self.sessions.read().await;
        let mut stats: Vec<SessionStats> = sessions.values().map(|s| s.stats()).collect();
        stats.sort_by_key(|s| s.session_id);
        stats
    }

    /// Run cleanup once
    ///
    /// Removes sessions stuck in `Connecting` for longer than
    /// `handshake_timeout`. Returns the number removed.
    pub async fn cleanup(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let timeout = self.config.handshake_timeout;

        let stale: Vec<SessionId> = sessions
            .values()
            .filter(|s| s.state() == SessionState::Connecting && s.age() > timeout)
            .map(|s| s.id())
            .collect();

        for id in &stale {
            if let Some(session) = sessions.remove(id) {
                session.close();
                tracing::info!(session_id = %id, "Session removed by cleanup");
            }
        }

        stale.len()
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        })
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

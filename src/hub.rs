//! Broadcast fan-out engine
//!
//! [`Hub::publish`] pushes one reading onto the queue of every active
//! session and returns without waiting for any transport. [`Hub::connect`]
//! registers a subscriber, seeds its queue with backfill and spawns its
//! delivery worker.
//!
//! # Backfill vs. live ordering
//!
//! `publish` appends to history *before* snapshotting the registry, and a
//! connecting session is seeded and activated while the history lock is
//! held. A reading published concurrently with a connect therefore reaches
//! the new session as backfill, as live data, or (rarely) both, but never
//! neither, and backfill always precedes live frames in its queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::delivery::{DeliveryWorker, Transport, WorkerExit};
use crate::error::Result;
use crate::reading::Reading;
use crate::registry::{ReadingFrame, RecentHistory, RegistryConfig, SessionRegistry};
use crate::session::{PushOutcome, Session, SessionId};
use crate::stats::HubStats;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A subscriber attached to the hub
#[derive(Debug)]
pub struct Subscription {
    /// Session id
    pub session_id: SessionId,
    /// Delivery worker task
    pub worker: tokio::task::JoinHandle<WorkerExit>,
}

/// Fan-out engine over a [`SessionRegistry`]
pub struct Hub {
    registry: Arc<SessionRegistry>,
    history: Mutex<RecentHistory>,
    next_sequence: AtomicU64,
    published: AtomicU64,
    enqueued: AtomicU64,
    failed_sessions: AtomicU64,
    started_at: Instant,
}

impl Hub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        let history = RecentHistory::with_capacity(config.history_capacity);
        Self {
            registry: Arc::new(SessionRegistry::with_config(config)),
            history: Mutex::new(history),
            next_sequence: AtomicU64::new(1),
            published: AtomicU64::new(0),
            enqueued: AtomicU64::new(0),
            failed_sessions: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// The underlying session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Configuration
    pub fn config(&self) -> &RegistryConfig {
        self.registry.config()
    }

    /// Deliver a reading to every active session
    ///
    /// Returns the number of sessions it was enqueued to. Zero active
    /// sessions is not an error; the reading still enters history.
    pub async fn publish(&self, reading: Reading) -> Result<usize> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let frame = ReadingFrame::encode(sequence, reading)?;

        self.history.lock().push(frame.clone());
        self.published.fetch_add(1, Ordering::Relaxed);

        let sessions = self.registry.lookup_active().await;
        let mut delivered = 0;

        for session in &sessions {
            match session.enqueue(frame.clone()) {
                PushOutcome::Queued => delivered += 1,
                PushOutcome::DroppedOldest => {
                    delivered += 1;
                    tracing::debug!(
                        session_id = %session.id(),
                        dropped = session.queue().dropped(),
                        "Queue full, dropped oldest reading"
                    );
                }
                // Closed between snapshot and enqueue
                PushOutcome::Refused => {}
            }
        }

        self.enqueued.fetch_add(delivered as u64, Ordering::Relaxed);

        tracing::trace!(
            sequence = sequence,
            device = %frame.device_id(),
            sessions = delivered,
            "Reading published"
        );

        Ok(delivered)
    }

    /// Register a session, seed its backfill and activate it
    ///
    /// The returned session has no worker; [`connect`](Self::connect) is the
    /// usual entry point.
    pub async fn open_session(&self) -> Result<Arc<Session>> {
        let session = self.registry.register().await?;
        let policy = self.config().backfill;

        let backfilled = {
            let history = self.history.lock();
            let frames = history.backfill(policy);
            let count = frames.len();
            for frame in frames {
                session.enqueue(frame);
            }
            session.activate();
            count
        };

        tracing::info!(
            session_id = %session.id(),
            backfill = ?policy,
            backfilled = backfilled,
            "Session active"
        );

        Ok(session)
    }

    /// Attach a subscriber over `transport`
    ///
    /// Spawns the session's delivery worker; the session is removed when the
    /// worker stops.
    pub async fn connect<T: Transport>(self: &Arc<Self>, transport: T) -> Result<Subscription> {
        let session = self.open_session().await?;
        let session_id = session.id();

        let mut worker = DeliveryWorker::new(
            session,
            Arc::clone(&self.registry),
            transport,
            self.config().delivery,
        );

        let hub = Arc::clone(self);
        let worker = tokio::spawn(async move {
            let exit = worker.run().await;
            if exit == WorkerExit::RetriesExhausted {
                hub.failed_sessions.fetch_add(1, Ordering::Relaxed);
            }
            exit
        });

        Ok(Subscription { session_id, worker })
    }

    /// Remove a subscriber; idempotent
    pub async fn disconnect(&self, session_id: SessionId) -> bool {
        self.registry.unregister(session_id).await
    }

    /// Stop fan-out to every session and let workers flush
    pub async fn shutdown(&self) -> usize {
        self.registry.drain_all().await
    }

    /// Drain every session and wait up to `timeout` for the workers to
    /// flush and unregister
    ///
    /// Returns `true` if the registry emptied before the deadline.
    pub async fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        let draining = self.shutdown().await;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.registry.is_empty().await {
                tracing::info!(sessions = draining, "All sessions drained");
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    sessions = draining,
                    remaining = self.registry.len().await,
                    "Drain timed out"
                );
                return false;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    /// Snapshot of hub statistics
    pub async fn stats(&self) -> HubStats {
        let sessions = self.registry.session_stats().await;
        let history_len = self.history.lock().len();

        HubStats {
            active_sessions: sessions
                .iter()
                .filter(|s| s.state.accepts_publish())
                .count(),
            registered_sessions: sessions.len(),
            total_sessions: self.registry.registered_total(),
            readings_published: self.published.load(Ordering::Relaxed),
            frames_enqueued: self.enqueued.load(Ordering::Relaxed),
            frames_dropped: sessions.iter().map(|s| s.dropped).sum(),
            sessions_failed: self.failed_sessions.load(Ordering::Relaxed),
            history_len,
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Spawn the registry's background cleanup task
    pub fn spawn_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        self.registry.spawn_cleanup_task()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::ChannelTransport;
    use crate::registry::BackfillPolicy;

    fn reading(temperature: i64) -> Reading {
        Reading::now("NYC", temperature, 45)
    }

    #[tokio::test]
    async fn test_publish_reaches_every_active_session_once() {
        let hub = Hub::new();
        let a = hub.open_session().await.unwrap();
        let b = hub.open_session().await.unwrap();
        let c = hub.open_session().await.unwrap();

        for t in 1..=3 {
            assert_eq!(hub.publish(reading(t)).await.unwrap(), 3);
        }

        for session in [&a, &b, &c] {
            let temps: Vec<i64> = std::iter::from_fn(|| session.queue().pop())
                .map(|f| f.reading.temperature)
                .collect();
            assert_eq!(temps, vec![1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn test_publish_skips_non_active_sessions() {
        let hub = Hub::new();
        let active = hub.open_session().await.unwrap();
        let connecting = hub.registry().register().await.unwrap();

        assert_eq!(hub.publish(reading(1)).await.unwrap(), 1);
        assert_eq!(active.queue().len(), 1);
        assert!(connecting.queue().is_empty());
    }

    #[tokio::test]
    async fn test_publish_without_sessions_only_updates_history() {
        let hub = Hub::new();

        assert_eq!(hub.publish(reading(1)).await.unwrap(), 0);

        let stats = hub.stats().await;
        assert_eq!(stats.readings_published, 1);
        assert_eq!(stats.history_len, 1);
        assert_eq!(stats.frames_enqueued, 0);
        assert_eq!(stats.registered_sessions, 0);
    }

    #[tokio::test]
    async fn test_overflow_counts_drops() {
        let hub = Hub::with_config(RegistryConfig::default().queue_capacity(2));
        let session = hub.open_session().await.unwrap();

        for t in 1..=3 {
            hub.publish(reading(t)).await.unwrap();
        }

        assert_eq!(session.queue().len(), 2);
        assert_eq!(session.queue().dropped(), 1);
        assert_eq!(hub.stats().await.frames_dropped, 1);
    }

    #[tokio::test]
    async fn test_backfill_last_n_on_connect() {
        let config = RegistryConfig::default().backfill(BackfillPolicy::LastN(3));
        let hub = Hub::with_config(config);

        for t in 1..=4 {
            hub.publish(reading(t)).await.unwrap();
        }

        let session = hub.open_session().await.unwrap();
        let temps: Vec<i64> = std::iter::from_fn(|| session.queue().pop())
            .map(|f| f.reading.temperature)
            .collect();
        assert_eq!(temps, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_backfill_none_by_default() {
        let hub = Hub::new();
        hub.publish(reading(1)).await.unwrap();

        let session = hub.open_session().await.unwrap();
        assert!(session.queue().is_empty());
    }

    #[tokio::test]
    async fn test_connect_delivers_over_transport() {
        let hub = Arc::new(Hub::new());
        let (transport, mut rx) = ChannelTransport::new(8);
        let subscription = hub.connect(transport).await.unwrap();

        hub.publish(reading(21)).await.unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let received: Reading = serde_json::from_slice(&payload).unwrap();
        assert_eq!(received.temperature, 21);

        // Dropping the receiver is a peer close
        drop(rx);
        let exit = tokio::time::timeout(Duration::from_secs(1), subscription.worker)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, WorkerExit::PeerClosed);
        assert!(hub.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let hub = Arc::new(Hub::new());
        let (transport, _rx) = ChannelTransport::new(8);
        let subscription = hub.connect(transport).await.unwrap();

        assert!(hub.disconnect(subscription.session_id).await);
        assert!(!hub.disconnect(subscription.session_id).await);

        let exit = tokio::time::timeout(Duration::from_secs(1), subscription.worker)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, WorkerExit::SessionClosed);
    }

    #[tokio::test]
    async fn test_shutdown_drains() {
        let hub = Arc::new(Hub::new());
        let (transport, mut rx) = ChannelTransport::new(8);
        let subscription = hub.connect(transport).await.unwrap();

        hub.publish(reading(5)).await.unwrap();
        assert_eq!(hub.shutdown().await, 1);

        // Not delivered after draining starts
        assert_eq!(hub.publish(reading(6)).await.unwrap(), 0);

        let exit = tokio::time::timeout(Duration::from_secs(1), subscription.worker)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, WorkerExit::Drained);

        let payload = rx.recv().await.unwrap();
        let received: Reading = serde_json::from_slice(&payload).unwrap();
        assert_eq!(received.temperature, 5);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_and_wait_flushes_blocked_subscriber() {
        let hub = Arc::new(Hub::new());
        let (transport, mut rx) = ChannelTransport::new(1);
        hub.connect(transport).await.unwrap();

        for t in 1..=3 {
            hub.publish(reading(t)).await.unwrap();
        }

        let reader = tokio::spawn(async move {
            // Subscriber is slow to start reading
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut temps = Vec::new();
            while let Some(payload) = rx.recv().await {
                temps.push(serde_json::from_slice::<Reading>(&payload).unwrap().temperature);
            }
            temps
        });

        assert!(hub.shutdown_and_wait(Duration::from_secs(2)).await);
        assert!(hub.registry().is_empty().await);
        assert_eq!(reader.await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_shutdown_and_wait_gives_up_at_deadline() {
        let hub = Hub::new();
        // No worker will ever remove this session
        let _session = hub.open_session().await.unwrap();

        assert!(!hub.shutdown_and_wait(Duration::from_millis(30)).await);
        assert_eq!(hub.registry().len().await, 1);
    }
}

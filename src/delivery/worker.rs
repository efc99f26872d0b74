//! Per-session delivery worker
//!
//! Drains one session's queue onto its transport:
//!
//! ```text
//!   ┌──────┐  frame queued   ┌─────────┐
//!   │ Idle │ ──────────────► │ Sending │
//!   └──────┘ ◄────────────── └─────────┘
//!      │      write ok            │
//!      │ peer closed /            │ retries exhausted /
//!      │ session closed /         │ peer closed
//!      │ drained                  │
//!      ▼                          ▼
//!   ┌────────────────────────────────┐
//!   │             Closed             │
//!   └────────────────────────────────┘
//! ```
//!
//! A failing write is retried up to `max_attempts` times with a fixed
//! backoff. After that the worker unregisters its own session; whatever was
//! still queued is discarded with it.

use std::sync::Arc;

use crate::registry::{ReadingFrame, SessionRegistry};
use crate::session::{Session, SessionState};

use super::policy::DeliveryPolicy;
use super::transport::Transport;

/// Worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for the queue to become non-empty
    Idle,
    /// Writing a frame (including backoff between attempts)
    Sending,
    /// Terminal
    Closed,
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The peer closed the transport
    PeerClosed,
    /// The session was unregistered by someone else
    SessionClosed,
    /// The session was draining and its queue is now empty
    Drained,
    /// A frame failed `max_attempts` times in a row
    RetriesExhausted,
}

enum Wake {
    Queue,
    PeerClosed,
}

/// Delivery worker for one session
pub struct DeliveryWorker<T: Transport> {
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
    transport: T,
    policy: DeliveryPolicy,
    state: WorkerState,
}

impl<T: Transport> DeliveryWorker<T> {
    /// Create a worker; call [`run`](Self::run) to start it
    pub fn new(
        session: Arc<Session>,
        registry: Arc<SessionRegistry>,
        transport: T,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            session,
            registry,
            transport,
            policy,
            state: WorkerState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run until the session ends
    pub async fn run(&mut self) -> WorkerExit {
        let exit = self.deliver_loop().await;

        // Every exit path leaves the registry without this session
        self.registry.unregister(self.session.id()).await;
        self.state = WorkerState::Closed;

        tracing::debug!(
            session_id = %self.session.id(),
            transport = self.transport.kind(),
            exit = ?exit,
            "Delivery worker stopped"
        );

        exit
    }

    async fn deliver_loop(&mut self) -> WorkerExit {
        loop {
            if self.session.state() == SessionState::Closed {
                return WorkerExit::SessionClosed;
            }

            if let Some(frame) = self.session.queue().pop() {
                self.state = WorkerState::Sending;
                if let Err(exit) = self.send_with_retry(&frame).await {
                    return exit;
                }
                self.session.mark_delivered();
                self.state = WorkerState::Idle;
                continue;
            }

            if self.session.state() == SessionState::Draining {
                return WorkerExit::Drained;
            }

            self.state = WorkerState::Idle;
            let wake = tokio::select! {
                _ = self.session.queue().notified() => Wake::Queue,
                _ = self.transport.closed() => Wake::PeerClosed,
            };

            if let Wake::PeerClosed = wake {
                return WorkerExit::PeerClosed;
            }
        }
    }

    async fn send_with_retry(&self, frame: &ReadingFrame) -> Result<(), WorkerExit> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.transport.send(frame.payload.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_closed() => return Err(WorkerExit::PeerClosed),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                tracing::warn!(
                    session_id = %self.session.id(),
                    sequence = frame.sequence,
                    attempts = attempt,
                    error = %err,
                    "Delivery failed, closing session"
                );
                return Err(WorkerExit::RetriesExhausted);
            }

            self.session.mark_retry();
            tracing::debug!(
                session_id = %self.session.id(),
                sequence = frame.sequence,
                attempt = attempt,
                error = %err,
                "Transport write failed, retrying"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.policy.backoff) => {}
                _ = self.transport.closed() => return Err(WorkerExit::PeerClosed),
            }

            if self.session.is_closed() {
                return Err(WorkerExit::SessionClosed);
            }

            attempt += 1;
        }
    }
}

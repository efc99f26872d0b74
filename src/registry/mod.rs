//! Session registry and recent history
//!
//! The registry owns every live [`Session`](crate::session::Session). The
//! [`Hub`](crate::hub::Hub) snapshots it on each publish and pushes the
//! encoded frame onto each active session's queue; each session's delivery
//! worker drains its own queue onto its transport.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SessionRegistry>
//!                   ┌──────────────────────────┐
//!                   │ sessions: HashMap<Id,    │
//!                   │   Arc<Session> {         │
//!                   │     state,               │
//!                   │     queue (bounded),     │
//!                   │   }                      │
//!                   │ >                        │
//!                   └────────────┬─────────────┘
//!                                │ lookup_active()
//!         ┌──────────────────────┼──────────────────────┐
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//!   [POST /readings]      [DeliveryWorker]       [DeliveryWorker]
//!    ingest()              queue.pop()            queue.pop()
//!         │                      │                      │
//!         └──► hub.publish() ──► transport.send() ──► SSE / TCP
//! ```
//!
//! # Zero-Copy Design
//!
//! A reading is encoded to JSON once per publish. Every queue holds a clone
//! of the same [`ReadingFrame`], whose `Bytes` payload is reference-counted.

pub mod config;
pub mod error;
pub mod frame;
pub mod history;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use frame::ReadingFrame;
pub use history::{BackfillPolicy, RecentHistory};
pub use store::SessionRegistry;

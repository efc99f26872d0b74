//! Real-time fan-out hub for IoT sensor readings
//!
//! Devices POST readings to the hub; every connected subscriber receives
//! each reading as soon as it is accepted, over Server-Sent Events or a raw
//! TCP socket.
//!
//! ```text
//!  DeviceSimulator ──POST /api/readings──► ingest ──► Hub::publish
//!                                                        │
//!                                        ┌───────────────┼───────────────┐
//!                                        ▼               ▼               ▼
//!                                    Session 1       Session 2       Session N
//!                                  (queue+worker)  (queue+worker)  (queue+worker)
//!                                        │               │               │
//!                                     SSE body       TCP socket         ...
//! ```
//!
//! `publish` never waits on a subscriber. Each session owns a bounded queue
//! drained by its own delivery worker, so a slow or dead subscriber only
//! affects itself.
//!
//! # Example
//!
//! ```no_run
//! use sensor_hub::{HubServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> sensor_hub::Result<()> {
//!     let server = HubServer::new(ServerConfig::default());
//!     server.run().await
//! }
//! ```

pub mod delivery;
pub mod error;
pub mod hub;
pub mod reading;
pub mod registry;
pub mod server;
pub mod session;
pub mod simulator;
pub mod stats;

pub use delivery::{ChannelTransport, DeliveryPolicy, Transport};
pub use error::{Error, Result, TransportError, ValidationError};
pub use hub::{Hub, Subscription};
pub use reading::{ingest, ingest_json, Reading};
pub use registry::{BackfillPolicy, RegistryConfig, SessionRegistry};
pub use server::{HubServer, ServerConfig};
pub use session::{Session, SessionId, SessionState};
pub use simulator::{DeviceSimulator, SimulatorConfig};
pub use stats::{HubStats, SessionStats};

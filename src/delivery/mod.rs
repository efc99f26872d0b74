//! Delivery from session queues to transports
//!
//! Each session gets one [`DeliveryWorker`] task. Workers are independent:
//! a subscriber whose transport stalls only delays its own queue, and when
//! its retries run out only its own session is torn down.

pub mod channel;
pub mod policy;
pub mod transport;
pub mod worker;

pub use channel::ChannelTransport;
pub use policy::DeliveryPolicy;
pub use transport::Transport;
pub use worker::{DeliveryWorker, WorkerExit, WorkerState};

//! Frames queued for delivery
//!
//! A published reading is encoded once and wrapped in a [`ReadingFrame`].
//! Every session queue and the recent-history buffer hold clones of the same
//! frame, so fan-out costs a reference-count bump per session, not a copy.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::reading::Reading;

/// A reading ready to be written to any transport
#[derive(Debug, Clone)]
pub struct ReadingFrame {
    /// Publish order, unique per hub
    pub sequence: u64,
    /// The reading itself
    pub reading: Arc<Reading>,
    /// Encoded JSON payload (zero-copy via reference counting)
    pub payload: Bytes,
    /// When the hub accepted the reading
    pub published_at: Instant,
}

impl ReadingFrame {
    /// Encode a reading into a frame
    pub fn encode(sequence: u64, reading: Reading) -> serde_json::Result<Self> {
        let payload = Bytes::from(reading.to_json_vec()?);
        Ok(Self {
            sequence,
            reading: Arc::new(reading),
            payload,
            published_at: Instant::now(),
        })
    }

    /// Device the reading came from
    pub fn device_id(&self) -> &str {
        &self.reading.device_id
    }
}

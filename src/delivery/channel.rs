//! Channel-backed transport
//!
//! Hands frames to another task over a bounded `mpsc` channel. The SSE
//! endpoint turns the receiving end into a response body; tests read it
//! directly.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use super::transport::Transport;
use crate::error::TransportError;

/// Default time a write may wait for room in the channel
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport writing into an `mpsc` channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Bytes>,
    write_timeout: Duration,
}

impl ChannelTransport {
    /// Create a transport and the receiver it feeds
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        Self::with_timeout(capacity, DEFAULT_WRITE_TIMEOUT)
    }

    /// Create a transport with a custom write timeout
    pub fn with_timeout(capacity: usize, write_timeout: Duration) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, write_timeout }, rx)
    }
}

impl Transport for ChannelTransport {
    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        self.tx
            .send_timeout(payload, self.write_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => TransportError::Timeout,
                SendTimeoutError::Closed(_) => TransportError::Closed,
            })
    }

    async fn closed(&self) {
        self.tx.closed().await
    }

    fn kind(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let (transport, mut rx) = ChannelTransport::new(4);

        transport.send(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_receiver_dropped_is_closed() {
        let (transport, rx) = ChannelTransport::new(4);
        drop(rx);

        let err = transport.send(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(err.is_closed());

        // Resolves immediately once the receiver is gone
        tokio::time::timeout(Duration::from_millis(100), transport.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_channel_times_out() {
        let (transport, _rx) = ChannelTransport::with_timeout(1, Duration::from_millis(10));

        transport.send(Bytes::from_static(b"1")).await.unwrap();
        let err = transport.send(Bytes::from_static(b"2")).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }
}

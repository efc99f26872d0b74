//! Transport capability
//!
//! The hub and delivery workers never see sockets or HTTP bodies. Anything
//! that can write an encoded frame and report when its peer went away can
//! carry a session: an SSE response body, a raw TCP socket, a test double.

use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

/// Outbound side of one subscriber connection
pub trait Transport: Send + Sync + 'static {
    /// Write one encoded frame
    ///
    /// [`TransportError::Closed`] means the peer is gone and the write must
    /// not be retried; any other error may be transient.
    fn send(&self, payload: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Resolve once the peer has closed the connection
    fn closed(&self) -> impl Future<Output = ()> + Send;

    /// Short name for logs
    fn kind(&self) -> &'static str {
        "transport"
    }
}

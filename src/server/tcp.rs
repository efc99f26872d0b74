//! Raw TCP transport
//!
//! Each frame is written as one line of JSON (newline-delimited). Anything
//! the peer sends is read and discarded; EOF or a read error on the inbound
//! half is the close event.
//!
//! A write that times out after part of a line went out leaves the stream
//! mid-line. The transport is then poisoned and reports `Closed` so the
//! frame is never written a second time.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

use crate::delivery::Transport;
use crate::error::TransportError;

/// Transport over an accepted TCP socket
pub struct TcpTransport {
    writer: Mutex<OwnedWriteHalf>,
    closed: watch::Receiver<bool>,
    poisoned: AtomicBool,
    write_timeout: Duration,
}

impl TcpTransport {
    /// Split the socket and spawn the task that watches for peer close
    ///
    /// The task ends, and the socket is released, when either the peer
    /// closes or the transport is dropped.
    pub fn spawn(stream: TcpStream, write_timeout: Duration) -> Self {
        let (reader, writer) = stream.into_split();
        let (closed_tx, closed_rx) = watch::channel(false);

        tokio::spawn(watch_peer(reader, closed_tx));

        Self {
            writer: Mutex::new(writer),
            closed: closed_rx,
            poisoned: AtomicBool::new(false),
            write_timeout,
        }
    }

    fn is_unusable(&self) -> bool {
        self.poisoned.load(Ordering::Acquire) || *self.closed.borrow()
    }

    fn poison(&self) {
        self.poisoned.store(true, Ordering::Release);
    }
}

async fn watch_peer(mut reader: OwnedReadHalf, closed: watch::Sender<bool>) {
    let mut buf = [0u8; 512];
    loop {
        let eof = tokio::select! {
            read = reader.read(&mut buf) => matches!(read, Ok(0) | Err(_)),
            // Transport dropped: nobody is left to tell
            _ = closed.closed() => return,
        };
        if eof {
            break;
        }
    }
    let _ = closed.send(true);
}

/// Write `payload` and a trailing newline, counting bytes as they go out
async fn write_line(
    writer: &mut OwnedWriteHalf,
    payload: &[u8],
    written: &mut usize,
) -> io::Result<()> {
    for part in [payload, b"\n".as_slice()] {
        let mut offset = 0;
        while offset < part.len() {
            let n = writer.write(&part[offset..]).await?;
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            offset += n;
            *written += n;
        }
    }
    writer.flush().await
}

fn map_io(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => TransportError::Closed,
        _ => TransportError::Io(e),
    }
}

impl Transport for TcpTransport {
    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        if self.is_unusable() {
            return Err(TransportError::Closed);
        }

        let mut writer = self.writer.lock().await;
        let mut written = 0;
        let result = tokio::time::timeout(
            self.write_timeout,
            write_line(&mut writer, &payload, &mut written),
        )
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if written == 0 => Err(map_io(e)),
            Err(_) if written == 0 => Err(TransportError::Timeout),
            Ok(Err(e)) => {
                self.poison();
                tracing::debug!(written = written, error = %e, "Partial line written, closing transport");
                Err(TransportError::Closed)
            }
            Err(_) => {
                self.poison();
                tracing::debug!(written = written, "Write timed out mid-line, closing transport");
                Err(TransportError::Closed)
            }
        }
    }

    async fn closed(&self) {
        let mut closed = self.closed.clone();
        loop {
            let is_closed = *closed.borrow_and_update();
            if is_closed || self.poisoned.load(Ordering::Acquire) {
                return;
            }
            if closed.changed().await.is_err() {
                return;
            }
        }
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }
}

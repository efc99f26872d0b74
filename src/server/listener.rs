//! Raw TCP subscriber listener
//!
//! Every accepted socket becomes a hub session delivering newline-delimited
//! JSON readings. Subscribers never send anything meaningful; closing the
//! socket ends the session.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::hub::Hub;
use crate::server::config::ServerConfig;
use crate::server::tcp::TcpTransport;

/// Accept loop for TCP subscribers
pub struct StreamListener {
    listener: TcpListener,
    config: ServerConfig,
    hub: Arc<Hub>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl StreamListener {
    /// Bind to `addr`
    pub async fn bind(addr: SocketAddr, config: ServerConfig, hub: Arc<Hub>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        tracing::info!(addr = %listener.local_addr()?, "TCP subscriber listener started");

        Ok(Self {
            listener,
            config,
            hub,
            connection_semaphore,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept subscribers until the future is dropped
    pub async fn accept_loop(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(peer = %peer_addr, error = %e, "Failed to configure socket");
            }
        }

        let transport = TcpTransport::spawn(socket, self.config.write_timeout);
        let subscription = match self.hub.connect(transport).await {
            Ok(subscription) => subscription,
            Err(e) => {
                // Dropping the transport closes the socket
                tracing::warn!(peer = %peer_addr, error = %e, "Connection rejected");
                return;
            }
        };

        let session_id = subscription.session_id;
        tracing::debug!(session_id = %session_id, peer = %peer_addr, "TCP subscriber connected");

        // Hold the connection permit for the lifetime of the session
        tokio::spawn(async move {
            let _permit = permit;
            match subscription.worker.await {
                Ok(exit) => {
                    tracing::debug!(session_id = %session_id, exit = ?exit, "TCP subscriber closed")
                }
                Err(e) => {
                    tracing::debug!(session_id = %session_id, error = %e, "Delivery worker failed")
                }
            }
        });
    }
}

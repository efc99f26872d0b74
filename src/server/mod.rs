//! Network front end
//!
//! [`HubServer`] binds the HTTP API (ingest, SSE subscribers, stats) and the
//! optional raw TCP subscriber listener around one shared [`Hub`].

pub mod config;
pub mod error;
pub mod http;
pub mod listener;
pub mod tcp;

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use tokio::net::TcpListener;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http::{router, AppState};
pub use listener::StreamListener;
pub use tcp::TcpTransport;

use crate::error::{Error, Result};
use crate::hub::Hub;
use crate::registry::RegistryConfig;

/// Sensor hub server
pub struct HubServer {
    config: ServerConfig,
    hub: Arc<Hub>,
}

impl HubServer {
    /// Create a server with default hub configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a server with custom hub configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        Self {
            config,
            hub: Arc::new(Hub::with_config(registry_config)),
        }
    }

    /// The hub shared by every front end
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server
    ///
    /// This method blocks until a listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` completes, then drain every session
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let http_listener = TcpListener::bind(self.config.http_addr).await?;
        tracing::info!(addr = %http_listener.local_addr()?, "HTTP server listening");

        let stream_listener = match self.config.stream_addr {
            Some(addr) => {
                Some(StreamListener::bind(addr, self.config.clone(), Arc::clone(&self.hub)).await?)
            }
            None => None,
        };

        let cleanup_handle = self.hub.spawn_cleanup_task();
        let app = router(Arc::clone(&self.hub), &self.config);

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = axum::serve(http_listener, app).into_future() => result.map_err(Error::Io),
            result = accept_stream(stream_listener.as_ref()) => result,
        };

        // Listeners are gone; let workers flush what is already queued
        self.hub.shutdown_and_wait(self.config.write_timeout).await;

        cleanup_handle.abort();

        result
    }
}

async fn accept_stream(listener: Option<&StreamListener>) -> Result<()> {
    match listener {
        Some(listener) => listener.accept_loop().await,
        None => std::future::pending().await,
    }
}

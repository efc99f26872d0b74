//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default HTTP port (ingest, SSE, stats)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default raw TCP subscriber port
pub const DEFAULT_STREAM_PORT: u16 = 8081;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    pub http_addr: SocketAddr,

    /// Address of the raw TCP subscriber listener (None = disabled)
    pub stream_addr: Option<SocketAddr>,

    /// Maximum concurrent TCP subscribers (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY on subscriber sockets
    pub tcp_nodelay: bool,

    /// Interval of SSE keep-alive comments
    pub sse_keep_alive: Duration,

    /// Frames buffered between a session's worker and its SSE body
    pub sse_buffer: usize,

    /// A single transport write must finish within this time
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_HTTP_PORT)),
            stream_addr: Some(SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_STREAM_PORT))),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            sse_keep_alive: Duration::from_secs(15),
            sse_buffer: 16,
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom HTTP address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            http_addr: addr,
            ..Default::default()
        }
    }

    /// Set the HTTP bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    /// Set the TCP subscriber address
    pub fn stream_addr(mut self, addr: SocketAddr) -> Self {
        self.stream_addr = Some(addr);
        self
    }

    /// Disable the TCP subscriber listener
    pub fn disable_stream_listener(mut self) -> Self {
        self.stream_addr = None;
        self
    }

    /// Set maximum TCP subscribers
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TCP_NODELAY on subscriber sockets
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set frames buffered per SSE subscriber (minimum 1)
    pub fn sse_buffer(mut self, frames: usize) -> Self {
        self.sse_buffer = frames.max(1);
        self
    }

    /// Set SSE keep-alive interval
    pub fn sse_keep_alive(mut self, interval: Duration) -> Self {
        self.sse_keep_alive = interval;
        self
    }

    /// Set transport write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.http_addr.port(), DEFAULT_HTTP_PORT);
        assert_eq!(config.stream_addr.map(|a| a.port()), Some(DEFAULT_STREAM_PORT));
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert_eq!(config.sse_buffer, 16);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.http_addr, addr);
    }

    #[test]
    fn test_disable_stream_listener() {
        let config = ServerConfig::default().disable_stream_listener();
        assert!(config.stream_addr.is_none());
    }

    #[test]
    fn test_builder_chaining() {
        let http: SocketAddr = "127.0.0.1:8000".parse().unwrap();
        let stream: SocketAddr = "127.0.0.1:8001".parse().unwrap();
        let config = ServerConfig::default()
            .bind(http)
            .stream_addr(stream)
            .max_connections(50)
            .tcp_nodelay(false)
            .sse_buffer(0)
            .sse_keep_alive(Duration::from_secs(30))
            .write_timeout(Duration::from_secs(1));

        assert_eq!(config.http_addr, http);
        assert_eq!(config.stream_addr, Some(stream));
        assert_eq!(config.max_connections, 50);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.sse_buffer, 1);
        assert_eq!(config.sse_keep_alive, Duration::from_secs(30));
        assert_eq!(config.write_timeout, Duration::from_secs(1));
    }
}

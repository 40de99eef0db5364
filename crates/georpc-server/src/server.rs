use std::sync::Arc;
use std::time::Duration;

use georpc_service::Service;
use tokio::net::{TcpListener, TcpStream};

use crate::conn::serve_conn;
use crate::error::ServerError;
use crate::service_map::ServiceMap;

/// A `Server` owns a [`ServiceMap`] and a default `handle_timeout`
/// (overridable per connection by [`georpc_protocol::ConnectOption`]), and
/// knows how to drive any [`georpc_codec::DuplexStream`] through the
/// request/response loop. Accepting connections — over TCP, Unix sockets,
/// or an HTTP CONNECT tunnel — is just a matter of handing it streams.
pub struct Server {
    service_map: Arc<ServiceMap>,
    handle_timeout: Duration,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self {
            service_map: Arc::new(ServiceMap::new()),
            handle_timeout: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_handle_timeout(mut self, timeout: Duration) -> Self {
        self.handle_timeout = timeout;
        self
    }

    pub fn register(&self, service: Arc<Service>) -> Result<(), ServerError> {
        self.service_map.register(service)
    }

    pub(crate) fn service_map(&self) -> Arc<ServiceMap> {
        self.service_map.clone()
    }

    pub(crate) fn handle_timeout(&self) -> Duration {
        self.handle_timeout
    }

    /// Serves one already-accepted connection. Returns once the peer
    /// disconnects or the handshake/codec fails; errors are logged by the
    /// caller's accept loop, never panic it.
    pub async fn serve_conn(
        &self,
        stream: Box<dyn georpc_codec::DuplexStream>,
    ) -> Result<(), ServerError> {
        serve_conn(stream, self.service_map(), self.handle_timeout()).await
    }

    /// Binds `addr` and accepts TCP connections until the listener itself
    /// errors (which on a healthy system means it was closed intentionally).
    pub async fn accept_tcp(self: Arc<Self>, addr: &str) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr, "georpc server listening");
        loop {
            let (stream, peer) = listener.accept().await?;
            let _ = stream.set_nodelay(true);
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.serve_conn(Box::new(stream)).await {
                    tracing::warn!(%peer, error = %e, "connection ended with error");
                }
            });
        }
    }

    #[cfg(unix)]
    pub async fn accept_unix(self: Arc<Self>, path: &str) -> Result<(), ServerError> {
        let listener = tokio::net::UnixListener::bind(path)?;
        tracing::info!(path, "georpc server listening on unix socket");
        loop {
            let (stream, _peer) = listener.accept().await?;
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.serve_conn(Box::new(stream)).await {
                    tracing::warn!(error = %e, "connection ended with error");
                }
            });
        }
    }
}

/// Convenience for callers that already have a connected [`TcpStream`] (for
/// example from a test harness) and just want it served once.
pub async fn serve_one(server: Arc<Server>, stream: TcpStream) -> Result<(), ServerError> {
    server.serve_conn(Box::new(stream)).await
}

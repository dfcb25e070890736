//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::{router, AppState};
use crate::error::Result;
use crate::ratelimit::{PolicyTable, RateLimiterBackend};

/// HTTP server for the rate limit service.
pub struct HttpServer<R: RateLimiterBackend + 'static> {
    /// Address to bind to
    addr: SocketAddr,
    /// Shared handler state
    state: AppState<R>,
}

impl<R: RateLimiterBackend + 'static> HttpServer<R> {
    /// Create a new HTTP server over a rate limiter and its route policies.
    pub fn new(addr: SocketAddr, rate_limiter: Arc<R>, policies: Arc<PolicyTable>) -> Self {
        Self {
            addr,
            state: AppState::new(rate_limiter, policies),
        }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;

        info!(
            addr = %listener.local_addr()?,
            "Starting HTTP server with graceful shutdown"
        );

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                e.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::RateLimiter;

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let rate_limiter = Arc::new(RateLimiter::new());
        let _server = HttpServer::new(addr, rate_limiter, Arc::new(PolicyTable::default()));
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = HttpServer::new(
            addr,
            Arc::new(RateLimiter::new()),
            Arc::new(PolicyTable::default()),
        );

        let result = server.serve_with_shutdown(std::future::ready(())).await;
        assert!(result.is_ok());
    }
}

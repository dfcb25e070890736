//! HTTP surface: the rate-limited chat route and the rate limit check API.

mod handlers;
mod headers;
mod server;

pub use handlers::{ChatMessage, ChatRequest, CheckRequest, CHECK_KEY_PREFIX, DEMO_REPLY};
pub use headers::{
    rate_limit_headers, rate_limited, RATE_LIMITED_MESSAGE, RATE_LIMIT_LIMIT,
    RATE_LIMIT_REMAINING, RATE_LIMIT_RESET,
};
pub use server::HttpServer;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::ratelimit::{PolicyTable, RateLimiterBackend};

/// State shared by every handler.
pub struct AppState<R: RateLimiterBackend> {
    /// The rate limiter instance
    pub limiter: Arc<R>,
    /// Per-route policies
    pub policies: Arc<PolicyTable>,
}

impl<R: RateLimiterBackend> AppState<R> {
    pub fn new(limiter: Arc<R>, policies: Arc<PolicyTable>) -> Self {
        Self { limiter, policies }
    }
}

impl<R: RateLimiterBackend> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            policies: Arc::clone(&self.policies),
        }
    }
}

/// Build the service router.
pub fn router<R: RateLimiterBackend + 'static>(state: AppState<R>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/ratelimit", post(handlers::check_rate_limit::<R>))
        .route("/api/chat", post(handlers::chat::<R>))
        .with_state(state)
}

//! HTTP request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::headers::{rate_limit_headers, rate_limited};
use super::AppState;
use crate::ratelimit::{ClientIdentifier, RateLimiterBackend, CHAT_ROUTE};

/// Reply sent by the chat route while no language model is wired in.
pub const DEMO_REPLY: &str = "Hi! I'm your AI travel assistant. No language model is \
configured on this server yet, so this is a demo reply. Ask me about destinations, \
budgets, itineraries, or any other travel advice you need.";

const INVALID_MESSAGES: &str = "Invalid request: messages array is required";

/// A chat turn sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker of the turn, e.g. `user` or `assistant`
    pub role: String,
    /// Text of the turn
    pub content: String,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far; must not be empty
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Body of `POST /v1/ratelimit`.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Caller identity to charge the request to
    pub identifier: String,
    /// Route whose rule applies; the rules default if absent
    #[serde(default)]
    pub route: Option<String>,
}

/// Prefix that keeps check API identifiers apart from client addresses
/// charged by the chat route.
pub const CHECK_KEY_PREFIX: &str = "api:";

/// Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Consume one slot for an explicit identifier and report the verdict.
///
/// Identifiers are trimmed and stored under [`CHECK_KEY_PREFIX`], so this
/// endpoint can never spend another client's chat quota.
pub async fn check_rate_limit<R: RateLimiterBackend + 'static>(
    State(state): State<AppState<R>>,
    body: Bytes,
) -> Response {
    let request: CheckRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed rate limit request");
            return bad_request(&format!("Invalid request: {}", e));
        }
    };

    let identifier = request.identifier.trim();
    if identifier.is_empty() {
        warn!("Received rate limit request with empty identifier");
        return bad_request("identifier is required");
    }

    let policy = match request.route.as_deref() {
        Some(route) => state.policies.policy_for(route),
        None => state.policies.default_policy(),
    };
    let key = format!("{}{}", CHECK_KEY_PREFIX, identifier);
    let verdict = state.limiter.check_and_consume(&key, &policy).await;

    info!(
        identifier = %identifier,
        route = ?request.route,
        admitted = verdict.admitted,
        remaining = verdict.remaining,
        "Rate limit decision made"
    );

    let status = if verdict.admitted {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };

    (status, rate_limit_headers(&verdict), Json(verdict)).into_response()
}

/// The chat endpoint, guarded by the per-client chat policy.
///
/// The limiter runs before the body is even parsed.
pub async fn chat<R: RateLimiterBackend + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let identifier = ClientIdentifier::from_headers(&headers);
    if identifier.is_anonymous() {
        debug!("No client address headers, charging the shared identifier");
    }
    let policy = state.policies.policy_for(CHAT_ROUTE);
    let verdict = state
        .limiter
        .check_and_consume(identifier.as_str(), &policy)
        .await;

    if !verdict.admitted {
        info!(
            identifier = %identifier,
            retry_after_secs = verdict.retry_after_secs(),
            "Chat request rate limited"
        );
        return rate_limited(&verdict);
    }

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(identifier = %identifier, error = %e, "Malformed chat request");
            return bad_request(INVALID_MESSAGES);
        }
    };

    if request.messages.is_empty() {
        return bad_request(INVALID_MESSAGES);
    }

    debug!(
        identifier = %identifier,
        messages = request.messages.len(),
        remaining = verdict.remaining,
        "Answering chat request in demo mode"
    );

    (
        StatusCode::OK,
        rate_limit_headers(&verdict),
        Json(json!({ "message": DEMO_REPLY })),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

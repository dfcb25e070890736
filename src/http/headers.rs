//! Rate limit response headers.

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ratelimit::Verdict;

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Message returned with every 429.
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// The limit/remaining/reset header trio for a verdict.
pub fn rate_limit_headers(verdict: &Verdict) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(verdict.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(verdict.remaining));
    if let Ok(reset) = HeaderValue::from_str(&verdict.reset_at_rfc3339()) {
        headers.insert(RATE_LIMIT_RESET, reset);
    }
    headers
}

/// A 429 response for a rejected verdict.
pub fn rate_limited(verdict: &Verdict) -> Response {
    let retry_after = verdict.retry_after_secs();
    let mut headers = rate_limit_headers(verdict);
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));

    (
        StatusCode::TOO_MANY_REQUESTS,
        headers,
        Json(json!({
            "error": RATE_LIMITED_MESSAGE,
            "retryAfter": retry_after,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(admitted: bool, remaining: u64) -> Verdict {
        Verdict {
            admitted,
            limit: 20,
            remaining,
            reset_at: 1_700_000_060_000,
            checked_at: 1_700_000_000_500,
        }
    }

    #[test]
    fn test_header_trio() {
        let headers = rate_limit_headers(&verdict(true, 19));

        assert_eq!(headers[&RATE_LIMIT_LIMIT], "20");
        assert_eq!(headers[&RATE_LIMIT_REMAINING], "19");
        assert_eq!(headers[&RATE_LIMIT_RESET], "2023-11-14T22:14:20.000Z");
    }

    #[test]
    fn test_rate_limited_response() {
        let response = rate_limited(&verdict(false, 0));

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "60");
        assert_eq!(response.headers()[&RATE_LIMIT_REMAINING], "0");
    }
}

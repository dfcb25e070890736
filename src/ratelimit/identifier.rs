//! Client identifier derivation.

use axum::http::HeaderMap;

/// Identifier shared by every request that carries no address headers.
pub const ANONYMOUS: &str = "anonymous";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// A key that partitions rate limit state, nominally the caller's address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentifier(String);

impl ClientIdentifier {
    /// Derive the identifier from request headers.
    ///
    /// Uses the first hop of `x-forwarded-for`, then `x-real-ip`. Requests
    /// with neither share the [`ANONYMOUS`] identifier and therefore one
    /// counter.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = header_str(headers, FORWARDED_FOR)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let id = forwarded
            .or_else(|| header_str(headers, REAL_IP).map(str::trim).filter(|v| !v.is_empty()))
            .unwrap_or(ANONYMOUS);

        Self(id.to_string())
    }

    /// Whether this is the shared fallback identifier.
    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl std::fmt::Display for ClientIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(k, v) in pairs {
            map.insert(k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let id = ClientIdentifier::from_headers(&headers(&[(
            "x-forwarded-for",
            "203.0.113.7, 10.0.0.1",
        )]));
        assert_eq!(id.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_preferred_over_real_ip() {
        let id = ClientIdentifier::from_headers(&headers(&[
            ("x-forwarded-for", "198.51.100.2"),
            ("x-real-ip", "192.0.2.9"),
        ]));
        assert_eq!(id.as_str(), "198.51.100.2");
    }

    #[test]
    fn test_real_ip_fallback() {
        let id = ClientIdentifier::from_headers(&headers(&[("x-real-ip", "192.0.2.9")]));
        assert_eq!(id.as_str(), "192.0.2.9");
    }

    #[test]
    fn test_blank_forwarded_for_falls_through() {
        let id = ClientIdentifier::from_headers(&headers(&[
            ("x-forwarded-for", " , 10.0.0.1"),
            ("x-real-ip", "192.0.2.9"),
        ]));
        assert_eq!(id.as_str(), "192.0.2.9");
    }

    #[test]
    fn test_anonymous_fallback() {
        let id = ClientIdentifier::from_headers(&HeaderMap::new());
        assert!(id.is_anonymous());
        assert_eq!(id.to_string(), "anonymous");
    }
}

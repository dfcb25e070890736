//! The outcome of a single admission check.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Result of consuming one request slot.
///
/// A rejection is an ordinary verdict with `admitted == false`, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Whether the request may proceed
    pub admitted: bool,
    /// Requests allowed per period
    pub limit: u64,
    /// Requests left in the current period
    pub remaining: u64,
    /// Epoch milliseconds at which the current period ends
    pub reset_at: u64,
    /// Epoch milliseconds observed when the check ran
    pub checked_at: u64,
}

impl Verdict {
    /// Whole seconds until the period resets, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_at.saturating_sub(self.checked_at).div_ceil(1000)
    }

    /// `reset_at` as an RFC 3339 UTC timestamp with millisecond precision.
    pub fn reset_at_rfc3339(&self) -> String {
        let millis = i64::try_from(self.reset_at).unwrap_or(i64::MAX);
        DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(reset_at: u64, checked_at: u64) -> Verdict {
        Verdict {
            admitted: false,
            limit: 2,
            remaining: 0,
            reset_at,
            checked_at,
        }
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(verdict(1_000, 200).retry_after_secs(), 1);
        assert_eq!(verdict(60_000, 0).retry_after_secs(), 60);
        assert_eq!(verdict(60_001, 0).retry_after_secs(), 61);
        assert_eq!(verdict(100, 200).retry_after_secs(), 0);
    }

    #[test]
    fn test_reset_at_rfc3339() {
        assert_eq!(
            verdict(1_700_000_000_123, 0).reset_at_rfc3339(),
            "2023-11-14T22:13:20.123Z"
        );
        assert_eq!(verdict(0, 0).reset_at_rfc3339(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(verdict(5_000, 1_000)).unwrap();
        assert_eq!(json["admitted"], false);
        assert_eq!(json["resetAt"], 5_000);
        assert_eq!(json["checkedAt"], 1_000);
    }
}

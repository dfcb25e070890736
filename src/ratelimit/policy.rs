//! Rate limit policies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TripgateError};

/// Built-in limit when no policy is supplied.
const DEFAULT_MAX_REQUESTS: u64 = 10;
/// Limit applied to the chat route.
const CHAT_MAX_REQUESTS: u64 = 20;
/// Length of one counting period for the built-in policies.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Named time windows for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Per-second rate limiting
    Second,
    /// Per-minute rate limiting
    Minute,
    /// Per-hour rate limiting
    Hour,
    /// Per-day rate limiting
    Day,
}

impl TimeWindow {
    /// Get the duration of this time window.
    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::Second => Duration::from_secs(1),
            TimeWindow::Minute => Duration::from_secs(60),
            TimeWindow::Hour => Duration::from_secs(3600),
            TimeWindow::Day => Duration::from_secs(86400),
        }
    }
}

/// One rate limit rule: at most `max_requests` per `interval` per identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Length of one counting period
    pub interval: Duration,
    /// Requests admitted per period for a single identifier
    pub max_requests: u64,
}

impl Policy {
    /// Create a policy from an interval and a request limit.
    pub fn new(interval: Duration, max_requests: u64) -> Self {
        Self {
            interval,
            max_requests,
        }
    }

    /// Create a policy over one of the named time windows.
    pub fn per_window(window: TimeWindow, max_requests: u64) -> Self {
        Self::new(window.duration(), max_requests)
    }

    /// The chat route's policy: 20 requests per minute.
    pub fn chat() -> Self {
        Self::new(DEFAULT_INTERVAL, CHAT_MAX_REQUESTS)
    }

    /// Interval length in milliseconds, saturating at `u64::MAX`.
    pub fn interval_ms(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }

    /// Reject policies that would make the limiter degenerate.
    ///
    /// The limiter accepts these values and behaves predictably with them
    /// (a zero limit rejects everything), so checking is left to callers
    /// that treat them as misconfiguration.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms() == 0 {
            return Err(TripgateError::Policy(
                "interval must be at least one millisecond".to_string(),
            ));
        }
        if self.max_requests == 0 {
            return Err(TripgateError::Policy(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_MAX_REQUESTS)
    }
}

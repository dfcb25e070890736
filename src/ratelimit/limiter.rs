//! Core rate limiter implementation.

use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::policy::Policy;
use super::verdict::Verdict;
use super::window::Window;

/// The core rate limiter that owns one counting window per identifier.
///
/// This struct is thread-safe and can be shared across multiple tasks. All
/// work for one identifier happens under that identifier's map entry lock,
/// so concurrent checks for the same caller never over-admit.
pub struct RateLimiter<C: Clock = SystemClock> {
    /// Counting windows indexed by client identifier
    windows: DashMap<String, Window>,
    /// Policy used by [`RateLimiter::check`]
    default_policy: Policy,
    /// Time source
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Create a new rate limiter with the built-in default policy.
    pub fn new() -> Self {
        Self::with_clock(Policy::default(), SystemClock)
    }

    /// Create a new rate limiter bound to `policy`.
    pub fn with_policy(policy: Policy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a new rate limiter reading time from `clock`.
    pub fn with_clock(default_policy: Policy, clock: C) -> Self {
        Self {
            windows: DashMap::new(),
            default_policy,
            clock,
        }
    }

    /// The policy this limiter applies when none is given.
    pub fn default_policy(&self) -> &Policy {
        &self.default_policy
    }

    /// Consume one request slot for `identifier` under the default policy.
    pub fn check(&self, identifier: &str) -> Verdict {
        self.check_and_consume(identifier, &self.default_policy)
    }

    /// Consume one request slot for `identifier` under `policy`.
    ///
    /// The counter grows on every call, so rejected requests also count
    /// against the current period.
    pub fn check_and_consume(&self, identifier: &str, policy: &Policy) -> Verdict {
        let now = self.clock.now_ms();

        trace!(
            identifier = %identifier,
            max_requests = policy.max_requests,
            interval_ms = policy.interval_ms(),
            "Checking rate limit"
        );

        // The entry guard holds the shard lock until the window is written
        let (admitted, window) = {
            let mut entry = self
                .windows
                .entry(identifier.to_string())
                .or_insert_with(|| {
                    debug!(identifier = %identifier, "Opening rate limit window");
                    Window::open(now, policy)
                });

            if entry.is_elapsed(now) {
                debug!(
                    identifier = %identifier,
                    previous_count = entry.count,
                    "Rate limit window rolled over"
                );
            }

            let admitted = entry.record(now, policy);
            (admitted, *entry)
        };

        if !admitted {
            debug!(
                identifier = %identifier,
                count = window.count,
                limit = policy.max_requests,
                "Rate limit exceeded"
            );
        }

        Verdict {
            admitted,
            limit: policy.max_requests,
            remaining: window.remaining(policy),
            reset_at: window.reset_at,
            checked_at: now,
        }
    }

    /// Drop every window whose period ended before now.
    ///
    /// Returns the number of windows removed.
    pub fn reclaim(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        self.windows.retain(|_, window| {
            let expired = window.is_elapsed(now);
            if expired {
                removed += 1;
            }
            !expired
        });

        if removed > 0 {
            debug!(removed, remaining = self.windows.len(), "Reclaimed expired windows");
        }
        removed
    }

    /// Get the request count stored for an identifier.
    ///
    /// Returns `None` if no window exists for the identifier.
    pub fn current_count(&self, identifier: &str) -> Option<u64> {
        self.windows.get(identifier).map(|w| w.count)
    }

    /// Clear all windows.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.windows.clear();
    }

    /// Get the number of live windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn limiter(interval_ms: u64, max: u64) -> (RateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new(0);
        let policy = Policy::new(Duration::from_millis(interval_ms), max);
        (RateLimiter::with_clock(policy, clock.clone()), clock)
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.window_count(), 0);
        assert_eq!(*limiter.default_policy(), Policy::default());
    }

    #[test]
    fn test_check_creates_window() {
        let (limiter, _clock) = limiter(1_000, 5);

        let verdict = limiter.check("client");

        assert!(verdict.admitted);
        assert_eq!(limiter.window_count(), 1);
        assert_eq!(limiter.current_count("client"), Some(1));
    }

    #[test]
    fn test_remaining_decreases_to_zero_then_rejects() {
        let (limiter, clock) = limiter(60_000, 4);

        for expected in (0..4).rev() {
            clock.advance(Duration::from_millis(10));
            let verdict = limiter.check("client");
            assert!(verdict.admitted);
            assert_eq!(verdict.remaining, expected);
            assert_eq!(verdict.limit, 4);
        }

        let verdict = limiter.check("client");
        assert!(!verdict.admitted);
        assert_eq!(verdict.remaining, 0);
    }

    #[test]
    fn test_concrete_rollover_scenario() {
        let (limiter, clock) = limiter(1_000, 2);

        let first = limiter.check("x");
        assert!(first.admitted);
        assert_eq!(first.remaining, 1);
        assert_eq!(first.reset_at, 1_000);

        clock.set(100);
        let second = limiter.check("x");
        assert!(second.admitted);
        assert_eq!(second.remaining, 0);

        clock.set(200);
        let third = limiter.check("x");
        assert!(!third.admitted);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.reset_at, 1_000);

        clock.set(1_001);
        let fourth = limiter.check("x");
        assert!(fourth.admitted);
        assert_eq!(fourth.remaining, 1);
        assert_eq!(fourth.reset_at, 2_001);
    }

    #[test]
    fn test_rejected_requests_still_count() {
        let (limiter, _clock) = limiter(1_000, 1);

        for _ in 0..4 {
            limiter.check("greedy");
        }

        assert_eq!(limiter.current_count("greedy"), Some(4));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _clock) = limiter(1_000, 2);

        for _ in 0..3 {
            limiter.check("a");
        }
        assert!(!limiter.check("a").admitted);

        let verdict = limiter.check("b");
        assert!(verdict.admitted);
        assert_eq!(verdict.remaining, 1);
    }

    #[test]
    fn test_explicit_policy_overrides_default() {
        let (limiter, _clock) = limiter(1_000, 100);
        let strict = Policy::new(Duration::from_millis(1_000), 1);

        assert!(limiter.check_and_consume("client", &strict).admitted);
        assert!(!limiter.check_and_consume("client", &strict).admitted);
    }

    #[test]
    fn test_zero_max_requests_rejects_everything() {
        let (limiter, _clock) = limiter(1_000, 0);

        let verdict = limiter.check("client");
        assert!(!verdict.admitted);
        assert_eq!(verdict.limit, 0);
        assert_eq!(verdict.remaining, 0);
    }

    #[test]
    fn test_zero_interval_rolls_over_once_the_clock_moves() {
        let (limiter, clock) = limiter(0, 3);
        clock.set(5_000);

        for expected in (0..3).rev() {
            let verdict = limiter.check("burst");
            assert!(verdict.admitted);
            assert_eq!(verdict.remaining, expected);
            assert_eq!(verdict.reset_at, 5_000);
        }
        assert!(!limiter.check("burst").admitted);

        for now in [5_001, 5_002, 9_999] {
            clock.set(now);
            let verdict = limiter.check("burst");
            assert!(verdict.admitted);
            assert_eq!(verdict.remaining, 2);
            assert_eq!(verdict.reset_at, now);
        }
    }

    #[test]
    fn test_reclaim_removes_only_expired_windows() {
        let (limiter, clock) = limiter(1_000, 3);

        limiter.check("old");
        clock.set(600);
        limiter.check("fresh");

        // "old" resets at 1000, "fresh" at 1600
        clock.set(1_200);
        assert_eq!(limiter.reclaim(), 1);
        assert_eq!(limiter.current_count("old"), None);
        assert_eq!(limiter.current_count("fresh"), Some(1));

        // A reclaimed identifier starts over like a first request
        let verdict = limiter.check("old");
        assert_eq!(verdict.remaining, 2);
        assert_eq!(verdict.reset_at, 2_200);
    }

    #[test]
    fn test_reclaim_keeps_window_at_exact_reset_time() {
        let (limiter, clock) = limiter(1_000, 3);
        limiter.check("client");

        clock.set(1_000);
        assert_eq!(limiter.reclaim(), 0);
        assert_eq!(limiter.window_count(), 1);
    }

    #[test]
    fn test_clear_windows() {
        let (limiter, _clock) = limiter(1_000, 3);

        limiter.check("client");
        assert_eq!(limiter.window_count(), 1);

        limiter.clear();
        assert_eq!(limiter.window_count(), 0);
    }

    #[test]
    fn test_concurrent_checks_never_over_admit() {
        const MAX: u64 = 25;
        const CALLS: usize = 64;

        let (limiter, _clock) = limiter(60_000, MAX);
        let admitted = AtomicU64::new(0);
        let barrier = Barrier::new(CALLS);

        std::thread::scope(|scope| {
            for _ in 0..CALLS {
                scope.spawn(|| {
                    barrier.wait();
                    if limiter.check("shared").admitted {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), MAX);
        assert_eq!(limiter.current_count("shared"), Some(CALLS as u64));
    }
}

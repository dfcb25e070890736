//! Rate limiter trait for abstracting the storage behind admission checks.

use async_trait::async_trait;

use super::clock::Clock;
use super::limiter::RateLimiter;
use super::policy::Policy;
use super::verdict::Verdict;

/// Trait for rate limiter implementations.
///
/// The HTTP layer is generic over this trait. The in-process
/// [`RateLimiter`] implements it; a limiter backed by a shared store with
/// atomic increment-and-expire would implement it too, keeping counts
/// consistent across service instances.
#[async_trait]
pub trait RateLimiterBackend: Send + Sync {
    /// Consume one request slot for `identifier` under `policy`.
    async fn check_and_consume(&self, identifier: &str, policy: &Policy) -> Verdict;

    /// Consume one request slot under the backend's default policy.
    async fn check(&self, identifier: &str) -> Verdict;

    /// Remove expired state, returning how many entries were dropped.
    async fn reclaim(&self) -> usize;
}

#[async_trait]
impl<C: Clock + 'static> RateLimiterBackend for RateLimiter<C> {
    async fn check_and_consume(&self, identifier: &str, policy: &Policy) -> Verdict {
        RateLimiter::check_and_consume(self, identifier, policy)
    }

    async fn check(&self, identifier: &str) -> Verdict {
        RateLimiter::check(self, identifier)
    }

    async fn reclaim(&self) -> usize {
        RateLimiter::reclaim(self)
    }
}

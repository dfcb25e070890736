//! Rate limiting logic and state management.

mod backend;
mod clock;
mod identifier;
mod limiter;
mod policy;
mod reclaimer;
mod rules;
mod verdict;
mod window;

pub use backend::RateLimiterBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use identifier::{ClientIdentifier, ANONYMOUS};
pub use limiter::RateLimiter;
pub use policy::{Policy, TimeWindow};
pub use reclaimer::{Reclaimer, ReclaimerHandle};
pub use rules::{PolicyTable, RateLimitRule, RulesConfig, CHAT_ROUTE};
pub use verdict::Verdict;
pub use window::Window;

//! Per-identifier counting window.

use super::policy::Policy;

/// One identifier's current counting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Requests seen in this period, admitted or not
    pub count: u64,
    /// Epoch milliseconds at which this period ends
    pub reset_at: u64,
}

impl Window {
    /// A fresh, empty window starting at `now_ms`.
    pub fn open(now_ms: u64, policy: &Policy) -> Self {
        Self {
            count: 0,
            reset_at: now_ms.saturating_add(policy.interval_ms()),
        }
    }

    /// Whether the period has ended at `now_ms`.
    ///
    /// A request landing exactly on `reset_at` still belongs to the old
    /// period. Reclamation uses the same rule.
    pub fn is_elapsed(&self, now_ms: u64) -> bool {
        now_ms > self.reset_at
    }

    /// Count one request at `now_ms`, rolling the period over first if it
    /// has elapsed. Returns `true` when the request fits in the policy.
    ///
    /// The count grows on every call, rejected ones included, so a client
    /// that keeps calling while over quota stays over quota until rollover.
    pub fn record(&mut self, now_ms: u64, policy: &Policy) -> bool {
        if self.is_elapsed(now_ms) {
            *self = Self::open(now_ms, policy);
        }

        self.count = self.count.saturating_add(1);
        self.count <= policy.max_requests
    }

    /// Requests left in this period under `policy`.
    pub fn remaining(&self, policy: &Policy) -> u64 {
        policy.max_requests.saturating_sub(self.count)
    }
}

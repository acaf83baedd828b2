//! Sliding-window rate limiting for authentication actions.
//!
//! Limits are computed from the attempt ledger on every check: only failed
//! attempts inside the trailing window count. Storage failures fail open.

mod limiter;
mod watch;


pub use limiter::{RateLimitRules, RateLimiter, normalize_identifier};
pub use watch::LedgerSubscription;

pub use crate::storage::ActionKind;

/// Outcome of a single rate-limit check. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining_attempts: u32,
    /// When the oldest counted failure leaves the window. Only set when the
    /// action is currently refused.
    pub reset_at: Option<i64>,
    pub attempt_count: u32,
}

impl RateLimitDecision {
    /// The permissive decision used for unconfigured actions and on errors.
    pub const fn open(remaining_attempts: u32) -> Self {
        Self {
            allowed: true,
            remaining_attempts,
            reset_at: None,
            attempt_count: 0,
        }
    }

    /// Seconds until another attempt is possible, `0` if allowed now.
    pub fn retry_after_secs(&self, now: i64) -> i64 {
        match (self.allowed, self.reset_at) {
            (false, Some(reset_at)) => (reset_at - now).max(0),
            _ => 0,
        }
    }
}

/// Error from [`RateLimiter::guard`].
#[derive(Debug, thiserror::Error)]
pub enum GuardError<E> {
    /// The action is throttled; nothing was attempted.
    #[error("too many {action} attempts, retry after {reset_at:?}")]
    Limited {
        action: ActionKind,
        reset_at: Option<i64>,
    },

    /// The guarded attempt ran and failed.
    #[error("{0}")]
    Attempt(E),
}

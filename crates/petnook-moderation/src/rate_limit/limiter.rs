//! Rate limiter over the attempt ledger.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use petnook_core::Clock;
use petnook_core::config::{Config, RateLimitRule};

use super::{GuardError, RateLimitDecision};
use crate::storage::{ActionKind, AttemptRecord, ModerationDatabase};

/// Static rule table keyed by action kind.
#[derive(Debug, Clone, Default)]
pub struct RateLimitRules {
    rules: HashMap<ActionKind, RateLimitRule>,
}

impl RateLimitRules {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, action: ActionKind, rule: RateLimitRule) -> Self {
        self.rules.insert(action, rule);
        self
    }

    /// Build the table from configuration. Unknown action names are skipped.
    pub fn from_config(config: &Config) -> Self {
        let mut rules = HashMap::new();
        for (name, rule) in &config.rate_limits {
            match name.parse::<ActionKind>() {
                Ok(action) => {
                    rules.insert(action, *rule);
                }
                Err(e) => warn!(error = %e, "Ignoring rate limit rule"),
            }
        }
        Self { rules }
    }

    pub fn get(&self, action: ActionKind) -> Option<RateLimitRule> {
        self.rules.get(&action).copied()
    }
}

/// Lower-case and trim an identifier so `Alice@Example.com ` and
/// `alice@example.com` share one ledger.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Throttles repeated authentication actions per identifier.
#[derive(Clone)]
pub struct RateLimiter {
    pub(super) db: ModerationDatabase,
    rules: Arc<RateLimitRules>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(db: ModerationDatabase, rules: RateLimitRules, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            rules: Arc::new(rules),
            clock,
        }
    }

    pub fn rule(&self, action: ActionKind) -> Option<RateLimitRule> {
        self.rules.get(action)
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Decide whether `(action, identifier)` may be attempted now.
    ///
    /// Unconfigured actions and ledger read failures are always allowed.
    #[instrument(skip(self, identifier), fields(op = "check"))]
    pub async fn check(&self, action: ActionKind, identifier: &str) -> RateLimitDecision {
        let Some(rule) = self.rule(action) else {
            return RateLimitDecision::open(u32::MAX);
        };
        let identifier = normalize_identifier(identifier);

        match self.db.list_attempts(action, &identifier).await {
            Ok(records) => decide(rule, &records, self.clock.now()),
            Err(e) => {
                warn!(
                    identifier = %identifier,
                    error = %e,
                    "Rate limit lookup failed, allowing attempt"
                );
                RateLimitDecision::open(rule.max_attempts)
            }
        }
    }

    /// Append an attempt to the ledger. Failures are logged and dropped.
    #[instrument(skip(self, identifier), fields(op = "record"))]
    pub async fn record(&self, action: ActionKind, identifier: &str, success: bool) {
        let identifier = normalize_identifier(identifier);
        let now = self.clock.now();

        if let Err(e) = self
            .db
            .insert_attempt(action, &identifier, Some(success), now)
            .await
        {
            warn!(
                identifier = %identifier,
                success,
                error = %e,
                "Failed to record attempt"
            );
        }
    }

    /// Clear failed attempts after a success. Returns how many were removed.
    #[instrument(skip(self, identifier), fields(op = "reset"))]
    pub async fn reset_failed_attempts(&self, action: ActionKind, identifier: &str) -> u64 {
        let identifier = normalize_identifier(identifier);

        match self.db.delete_failed_attempts(action, &identifier).await {
            Ok(removed) => {
                if removed > 0 {
                    debug!(identifier = %identifier, removed, "Cleared failed attempts");
                }
                removed
            }
            Err(e) => {
                warn!(
                    identifier = %identifier,
                    error = %e,
                    "Failed to clear failed attempts"
                );
                0
            }
        }
    }

    /// Run `attempt` under the limiter.
    ///
    /// Refuses without running when throttled. Otherwise records the outcome
    /// and, on success, clears earlier failures for the identifier.
    pub async fn guard<T, E, F, Fut>(
        &self,
        action: ActionKind,
        identifier: &str,
        attempt: F,
    ) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let decision = self.check(action, identifier).await;
        if !decision.allowed {
            return Err(GuardError::Limited {
                action,
                reset_at: decision.reset_at,
            });
        }

        match attempt().await {
            Ok(value) => {
                self.record(action, identifier, true).await;
                self.reset_failed_attempts(action, identifier).await;
                Ok(value)
            }
            Err(e) => {
                self.record(action, identifier, false).await;
                Err(GuardError::Attempt(e))
            }
        }
    }
}

/// Compute a decision from the full ledger for one identifier.
///
/// A failure stops counting once it is `window` old, so `now == reset_at`
/// already admits the next attempt.
pub(super) fn decide(rule: RateLimitRule, records: &[AttemptRecord], now: i64) -> RateLimitDecision {
    let window_start = now - rule.window_secs();
    let counted: Vec<i64> = records
        .iter()
        .filter(|r| r.is_failure() && r.occurred_at > window_start)
        .map(|r| r.occurred_at)
        .collect();

    let attempt_count = u32::try_from(counted.len()).unwrap_or(u32::MAX);
    let allowed = attempt_count < rule.max_attempts;
    let reset_at = if allowed {
        None
    } else {
        counted
            .iter()
            .min()
            .map(|oldest| oldest + rule.window_secs())
    };

    RateLimitDecision {
        allowed,
        remaining_attempts: rule.max_attempts.saturating_sub(attempt_count),
        reset_at,
        attempt_count,
    }
}

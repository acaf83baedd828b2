//! Moderation console actions.
//!
//! Thin callers over the punishment state machine, the rate limiter and the
//! notification store. Each action takes human-entered input, runs exactly
//! once and renders a line of text for the operator. Errors are returned
//! as-is and never retried.

mod duration;

use std::fmt::Write as _;

use tracing::instrument;

pub use duration::{HumanDuration, parse_ban_days, parse_duration};

use crate::notifications::messages::format_timestamp;
use crate::notifications::{NotificationDispatcher, NotificationError};
use crate::punishment::{LiftOutcome, PunishmentError, PunishmentService};
use crate::rate_limit::{ActionKind, RateLimiter};
use crate::storage::DurationUnit;

/// Errors surfaced to the console operator.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("a reason is required to restrict chat")]
    MissingReason,

    #[error(transparent)]
    Punishment(#[from] PunishmentError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

/// Operator-facing moderation actions.
#[derive(Clone)]
pub struct ModerationConsole {
    punishments: PunishmentService,
    limiter: RateLimiter,
    notifier: NotificationDispatcher,
}

impl ModerationConsole {
    pub const fn new(
        punishments: PunishmentService,
        limiter: RateLimiter,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            punishments,
            limiter,
            notifier,
        }
    }

    #[instrument(skip(self), fields(cmd = "ban"))]
    pub async fn ban(
        &self,
        user_id: &str,
        duration: &str,
        admin: &str,
    ) -> Result<String, ConsoleError> {
        let days = parse_ban_days(duration)?;
        let applied = self.punishments.apply_ban(user_id, days, admin).await?;
        Ok(format!(
            "Banned {user_id} for {} until {} ({} content items hidden)",
            DurationUnit::Days.label(days),
            format_timestamp(applied.expires_at),
            applied.hidden_items,
        ))
    }

    #[instrument(skip(self), fields(cmd = "unban"))]
    pub async fn unban(&self, user_id: &str) -> Result<String, ConsoleError> {
        Ok(match self.punishments.lift_ban(user_id).await? {
            LiftOutcome::Lifted { restored_items } => {
                format!("Lifted ban on {user_id} ({restored_items} content items restored)")
            }
            LiftOutcome::NotPunished => format!("{user_id} is not banned"),
        })
    }

    /// Restrict chat. A bare number in `duration` is read as hours.
    #[instrument(skip(self, reason), fields(cmd = "restrict"))]
    pub async fn restrict(
        &self,
        user_id: &str,
        duration: &str,
        reason: Option<&str>,
        admin: &str,
    ) -> Result<String, ConsoleError> {
        let parsed = parse_duration(duration, DurationUnit::Hours)?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(ConsoleError::MissingReason)?;

        let applied = self
            .punishments
            .apply_chat_restriction(user_id, parsed.amount, parsed.unit, reason, admin)
            .await?;
        Ok(format!(
            "Restricted chat for {user_id} for {} until {}",
            parsed.unit.label(parsed.amount),
            format_timestamp(applied.expires_at),
        ))
    }

    #[instrument(skip(self), fields(cmd = "unrestrict"))]
    pub async fn unrestrict(&self, user_id: &str) -> Result<String, ConsoleError> {
        Ok(match self.punishments.lift_chat_restriction(user_id).await? {
            LiftOutcome::Lifted { .. } => format!("Lifted chat restriction on {user_id}"),
            LiftOutcome::NotPunished => format!("{user_id} is not chat restricted"),
        })
    }

    pub async fn status(&self, user_id: &str) -> Result<String, ConsoleError> {
        let status = self.punishments.status(user_id).await?;
        let mut out = format!("{user_id}:");

        match &status.ban {
            Some(ban) => {
                let _ = write!(out, " banned until {}", format_timestamp(ban.expires_at));
                if let Some(by) = &ban.banned_by {
                    let _ = write!(out, " by {by}");
                }
            }
            None => out.push_str(" not banned"),
        }
        out.push(';');
        match &status.chat_restriction {
            Some(r) => {
                let _ = write!(
                    out,
                    " chat restricted until {}",
                    format_timestamp(r.expires_at)
                );
                if let Some(reason) = &r.reason {
                    let _ = write!(out, " ({reason})");
                }
            }
            None => out.push_str(" chat allowed"),
        }
        Ok(out)
    }

    pub async fn limit_check(&self, action: ActionKind, identifier: &str) -> String {
        let decision = self.limiter.check(action, identifier).await;
        if decision.allowed {
            format!(
                "{action} for {identifier}: allowed, {} attempts left ({} failed in window)",
                decision.remaining_attempts, decision.attempt_count
            )
        } else {
            let reset = decision
                .reset_at
                .map_or_else(|| "unknown".to_string(), format_timestamp);
            format!(
                "{action} for {identifier}: blocked after {} failures, resets at {reset}",
                decision.attempt_count
            )
        }
    }

    pub async fn limit_reset(&self, action: ActionKind, identifier: &str) -> String {
        let removed = self.limiter.reset_failed_attempts(action, identifier).await;
        format!("Cleared {removed} failed {action} attempts for {identifier}")
    }

    /// One line per notification, newest first.
    pub async fn notifications(&self, user_id: &str) -> Result<Vec<String>, ConsoleError> {
        let events = self.notifier.list_for_user(user_id).await?;
        Ok(events
            .into_iter()
            .map(|n| {
                format!(
                    "{} [{}] {}: {}",
                    format_timestamp(n.created_at),
                    if n.is_read { "read" } else { "unread" },
                    n.title,
                    n.body
                )
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;

    use petnook_core::config::{Config, PunishmentConfig};
    use petnook_core::{Clock, ManualClock};

    use super::*;
    use crate::rate_limit::RateLimitRules;
    use crate::storage::{ModerationDatabase, NewUser};

    const T0: i64 = 1_700_000_000;

    async fn console() -> ModerationConsole {
        let db = ModerationDatabase::open_in_memory().await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(T0));
        let notifier = NotificationDispatcher::new(db.clone(), clock.clone(), 5);
        let punishments = PunishmentService::new(
            db.clone(),
            notifier.clone(),
            clock.clone(),
            PunishmentConfig::default(),
        );
        let limiter = RateLimiter::new(
            db.clone(),
            RateLimitRules::from_config(&Config::default()),
            clock,
        );
        db.create_user(
            &NewUser {
                id: "u1",
                display_name: Some("Mochi"),
                profile_image: None,
            },
            T0,
        )
        .await
        .unwrap();
        ModerationConsole::new(punishments, limiter, notifier)
    }

    #[tokio::test]
    async fn ban_twice_reports_existing_ban() {
        let console = console().await;

        let msg = console.ban("u1", "3d", "admin-1").await.unwrap();
        assert_eq!(
            msg,
            "Banned u1 for 3 days until 2023-11-17 22:13 UTC (0 content items hidden)"
        );

        let err = console.ban("u1", "1", "admin-1").await.unwrap_err();
        assert_eq!(err.to_string(), "already banned until 2023-11-17 22:13 UTC");
    }

    #[tokio::test]
    async fn restrict_requires_reason() {
        let console = console().await;

        let err = console.restrict("u1", "12h", Some("  "), "admin-1").await.unwrap_err();
        assert!(matches!(err, ConsoleError::MissingReason));

        let msg = console
            .restrict("u1", "12", Some("spam"), "admin-1")
            .await
            .unwrap();
        assert_eq!(
            msg,
            "Restricted chat for u1 for 12 hours until 2023-11-15 10:13 UTC"
        );

        let status = console.status("u1").await.unwrap();
        assert_eq!(
            status,
            "u1: not banned; chat restricted until 2023-11-15 10:13 UTC (spam)"
        );
    }

    #[tokio::test]
    async fn bad_duration_is_rejected_before_acting() {
        let console = console().await;
        let err = console.ban("u1", "soon", "admin-1").await.unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidDuration(_)));
        assert_eq!(
            console.status("u1").await.unwrap(),
            "u1: not banned; chat allowed"
        );
    }

    #[tokio::test]
    async fn lifts_report_noop() {
        let console = console().await;
        assert_eq!(console.unban("u1").await.unwrap(), "u1 is not banned");
        assert_eq!(
            console.unrestrict("u1").await.unwrap(),
            "u1 is not chat restricted"
        );
    }

    #[tokio::test]
    async fn notifications_list_newest_first() {
        let console = console().await;
        console.ban("u1", "1", "admin-1").await.unwrap();
        console.unban("u1").await.unwrap();

        let lines = console.notifications("u1").await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[unread] Account restored"));
        assert!(lines[1].contains("Account suspended"));
    }

    #[tokio::test]
    async fn limit_check_and_reset() {
        let console = console().await;
        for _ in 0..3 {
            console.limiter.record(ActionKind::Signup, "x@example.com", false).await;
        }

        let blocked = console.limit_check(ActionKind::Signup, "x@example.com").await;
        assert!(blocked.contains("blocked after 3 failures"), "{blocked}");

        assert_eq!(
            console.limit_reset(ActionKind::Signup, "x@example.com").await,
            "Cleared 3 failed signup attempts for x@example.com"
        );
        let allowed = console.limit_check(ActionKind::Signup, "x@example.com").await;
        assert!(allowed.contains("allowed, 3 attempts left"), "{allowed}");
    }
}

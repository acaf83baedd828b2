//! Apply and lift bans and chat restrictions.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use petnook_core::Clock;
use petnook_core::clock::SECS_PER_DAY;
use petnook_core::config::PunishmentConfig;

use super::{
    BanApplied, LiftOutcome, PunishmentError, PunishmentKind, PunishmentStatus,
    RestrictionApplied,
};
use crate::notifications::{NotificationDispatcher, messages};
use crate::storage::{
    AccountStatus, BanLiftParams, BanParams, CommitOutcome, DatabaseError, DurationUnit, ModerationDatabase,
    RestrictionParams, UserAccount,
};

/// Punishment state machine over the user store.
///
/// Each operation reads the user, checks its precondition at the current
/// time and commits with a revision-checked write. If another writer got in
/// between, the whole read-check-write sequence is repeated up to
/// `conflict_retries` times.
#[derive(Clone)]
pub struct PunishmentService {
    db: ModerationDatabase,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    limits: PunishmentConfig,
}

impl PunishmentService {
    pub fn new(
        db: ModerationDatabase,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        limits: PunishmentConfig,
    ) -> Self {
        Self {
            db,
            notifier,
            clock,
            limits,
        }
    }

    /// Effective punishment state of a user right now.
    pub async fn status(&self, user_id: &str) -> Result<PunishmentStatus, PunishmentError> {
        let user = self.load_user(user_id).await?;
        Ok(PunishmentStatus::of(&user, self.clock.now()))
    }

    /// Ban a user for `duration_days`, hiding their profile and content.
    #[instrument(skip(self), fields(op = "apply_ban"))]
    pub async fn apply_ban(
        &self,
        user_id: &str,
        duration_days: i64,
        acting_admin: &str,
    ) -> Result<BanApplied, PunishmentError> {
        require_admin(acting_admin)?;
        if !(1..=self.limits.max_ban_days).contains(&duration_days) {
            return Err(PunishmentError::Validation(format!(
                "ban duration must be between 1 and {} days",
                self.limits.max_ban_days
            )));
        }

        let mut conflicts = 0;
        loop {
            let user = self.load_user(user_id).await?;
            let now = self.clock.now();

            if let Some(until) = user.ban_active_until(now) {
                return Err(PunishmentError::AlreadyPunished {
                    kind: PunishmentKind::Ban,
                    until,
                });
            }

            let expires_at = now + duration_days * SECS_PER_DAY;
            // A lapsed ban leaves the live fields empty; keep the original
            // snapshot rather than archiving the blanks.
            let archive = user.archived_profile();
            let (archived_display_name, archived_profile_image, archived_at, archived_status) =
                match &archive {
                    Some(a) => (
                        a.display_name.as_deref(),
                        a.profile_image.as_deref(),
                        a.archived_at,
                        a.status,
                    ),
                    None => (
                        user.display_name.as_deref(),
                        user.profile_image.as_deref(),
                        now,
                        pre_ban_status(user.status),
                    ),
                };

            let outcome = self
                .db
                .commit_ban(&BanParams {
                    user_id,
                    expected_revision: user.revision,
                    now,
                    banned_by: acting_admin,
                    duration_days,
                    expires_at,
                    archived_display_name,
                    archived_profile_image,
                    archived_at,
                    archived_status,
                })
                .await?;

            match outcome {
                CommitOutcome::Applied { content_rows } => {
                    info!(
                        user_id = %user_id,
                        banned_by = %acting_admin,
                        expires_at,
                        hidden_items = content_rows,
                        "User banned"
                    );
                    self.notifier
                        .send_message(user_id, messages::ban_applied(duration_days, expires_at))
                        .await;
                    return Ok(BanApplied {
                        expires_at,
                        hidden_items: content_rows,
                    });
                }
                CommitOutcome::Conflict => self.note_conflict(user_id, &mut conflicts)?,
            }
        }
    }

    /// Lift a ban, restoring the archived profile and unhiding content.
    ///
    /// Users without ban state are left untouched.
    #[instrument(skip(self), fields(op = "lift_ban"))]
    pub async fn lift_ban(&self, user_id: &str) -> Result<LiftOutcome, PunishmentError> {
        let mut conflicts = 0;
        loop {
            let user = self.load_user(user_id).await?;
            if !user.has_ban_state() {
                return Ok(LiftOutcome::NotPunished);
            }

            let now = self.clock.now();
            let archive = user.archived_profile();
            let display_name = archive
                .as_ref()
                .and_then(|a| a.display_name.as_deref())
                .or(user.display_name.as_deref());
            let profile_image = archive
                .as_ref()
                .and_then(|a| a.profile_image.as_deref())
                .or(user.profile_image.as_deref());
            let status = archive
                .as_ref()
                .map_or(AccountStatus::Active, |a| a.status);

            let outcome = self
                .db
                .commit_ban_lift(&BanLiftParams {
                    user_id,
                    expected_revision: user.revision,
                    now,
                    display_name,
                    profile_image,
                    status,
                })
                .await?;

            match outcome {
                CommitOutcome::Applied { content_rows } => {
                    info!(user_id = %user_id, restored_items = content_rows, "Ban lifted");
                    self.notifier
                        .send_message(user_id, messages::ban_lifted())
                        .await;
                    return Ok(LiftOutcome::Lifted {
                        restored_items: content_rows,
                    });
                }
                CommitOutcome::Conflict => self.note_conflict(user_id, &mut conflicts)?,
            }
        }
    }

    /// Stop a user from sending messages for `duration` hours or days.
    #[instrument(skip(self, reason), fields(op = "apply_chat_restriction"))]
    pub async fn apply_chat_restriction(
        &self,
        user_id: &str,
        duration: i64,
        unit: DurationUnit,
        reason: &str,
        acting_admin: &str,
    ) -> Result<RestrictionApplied, PunishmentError> {
        require_admin(acting_admin)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PunishmentError::Validation(
                "a reason is required for chat restrictions".to_string(),
            ));
        }
        let max = match unit {
            DurationUnit::Hours => self.limits.max_restriction_hours,
            DurationUnit::Days => self.limits.max_restriction_days,
        };
        if !(1..=max).contains(&duration) {
            return Err(PunishmentError::Validation(format!(
                "restriction duration must be between 1 and {max} {unit}"
            )));
        }

        let mut conflicts = 0;
        loop {
            let user = self.load_user(user_id).await?;
            let now = self.clock.now();

            if let Some(until) = user.ban_active_until(now) {
                return Err(PunishmentError::AlreadyPunished {
                    kind: PunishmentKind::Ban,
                    until,
                });
            }
            if let Some(until) = user.chat_restriction_active_until(now) {
                return Err(PunishmentError::AlreadyPunished {
                    kind: PunishmentKind::ChatRestriction,
                    until,
                });
            }

            let expires_at = now + duration * unit.secs();
            let outcome = self
                .db
                .commit_chat_restriction(&RestrictionParams {
                    user_id,
                    expected_revision: user.revision,
                    now,
                    restricted_by: acting_admin,
                    expires_at,
                    reason,
                    duration,
                    unit,
                })
                .await?;

            match outcome {
                CommitOutcome::Applied { .. } => {
                    info!(
                        user_id = %user_id,
                        restricted_by = %acting_admin,
                        expires_at,
                        "User chat restricted"
                    );
                    self.notifier
                        .send_message(
                            user_id,
                            messages::chat_restricted(duration, unit, reason, expires_at),
                        )
                        .await;
                    return Ok(RestrictionApplied { expires_at });
                }
                CommitOutcome::Conflict => self.note_conflict(user_id, &mut conflicts)?,
            }
        }
    }

    /// Clear every chat-restriction field.
    #[instrument(skip(self), fields(op = "lift_chat_restriction"))]
    pub async fn lift_chat_restriction(
        &self,
        user_id: &str,
    ) -> Result<LiftOutcome, PunishmentError> {
        let mut conflicts = 0;
        loop {
            let user = self.load_user(user_id).await?;
            if !user.has_chat_restriction_state() {
                return Ok(LiftOutcome::NotPunished);
            }

            let outcome = self
                .db
                .commit_chat_restriction_lift(user_id, user.revision, self.clock.now())
                .await?;

            match outcome {
                CommitOutcome::Applied { .. } => {
                    info!(user_id = %user_id, "Chat restriction lifted");
                    self.notifier
                        .send_message(user_id, messages::chat_restriction_lifted())
                        .await;
                    return Ok(LiftOutcome::Lifted { restored_items: 0 });
                }
                CommitOutcome::Conflict => self.note_conflict(user_id, &mut conflicts)?,
            }
        }
    }

    async fn load_user(&self, user_id: &str) -> Result<UserAccount, PunishmentError> {
        match self.db.get_user(user_id).await {
            Ok(user) => Ok(user),
            Err(DatabaseError::NotFound(_)) => Err(PunishmentError::UserNotFound(user_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Count a lost conditional write; give up once the retry budget is spent.
    fn note_conflict(&self, user_id: &str, conflicts: &mut u32) -> Result<(), PunishmentError> {
        if *conflicts >= self.limits.conflict_retries {
            warn!(user_id = %user_id, "Giving up after repeated write conflicts");
            return Err(PunishmentError::Conflict(user_id.to_string()));
        }
        *conflicts += 1;
        warn!(user_id = %user_id, attempt = *conflicts, "User changed concurrently, retrying");
        Ok(())
    }
}

fn require_admin(acting_admin: &str) -> Result<(), PunishmentError> {
    if acting_admin.trim().is_empty() {
        return Err(PunishmentError::Validation(
            "acting admin is required".to_string(),
        ));
    }
    Ok(())
}

/// Status to restore after a ban. A `banned` row without an archive goes
/// back to active.
const fn pre_ban_status(status: AccountStatus) -> AccountStatus {
    match status {
        AccountStatus::Banned => AccountStatus::Active,
        other => other,
    }
}

//! User account queries and conditional punishment writes.
//!
//! Every punishment write is guarded by `revision`: the update only lands if
//! the row still carries the revision the caller read. Ban and ban-lift writes
//! also flip the visibility of the owner's content inside the same
//! transaction.

use sqlx::{Sqlite, Transaction};
use tracing::warn;

use petnook_core::db::DatabaseError;

use super::db::ModerationDatabase;
use super::models::{AccountStatus, CommitOutcome, DurationUnit, NewUser, UserAccount};

/// Parameters for committing a ban.
pub struct BanParams<'a> {
    pub user_id: &'a str,
    pub expected_revision: i64,
    pub now: i64,
    pub banned_by: &'a str,
    pub duration_days: i64,
    pub expires_at: i64,
    /// Snapshot restored when the ban is lifted.
    pub archived_display_name: Option<&'a str>,
    pub archived_profile_image: Option<&'a str>,
    pub archived_at: i64,
    pub archived_status: AccountStatus,
}

/// Parameters for committing a ban lift.
pub struct BanLiftParams<'a> {
    pub user_id: &'a str,
    pub expected_revision: i64,
    pub now: i64,
    pub display_name: Option<&'a str>,
    pub profile_image: Option<&'a str>,
    /// Status the account returns to.
    pub status: AccountStatus,
}

/// Parameters for committing a chat restriction.
pub struct RestrictionParams<'a> {
    pub user_id: &'a str,
    pub expected_revision: i64,
    pub now: i64,
    pub restricted_by: &'a str,
    pub expires_at: i64,
    pub reason: &'a str,
    pub duration: i64,
    pub unit: DurationUnit,
}

const COMMIT_BAN_SQL: &str = "UPDATE users SET \
    display_name = NULL, profile_image = NULL, is_profile_visible = 0, status = ?, \
    ban_started_at = ?, banned_by = ?, ban_duration_days = ?, ban_expires_at = ?, \
    archived_display_name = ?, archived_profile_image = ?, archived_at = ?, archived_status = ?, \
    revision = revision + 1, updated_at = ? \
    WHERE id = ? AND revision = ?";

const COMMIT_BAN_LIFT_SQL: &str = "UPDATE users SET \
    display_name = ?, profile_image = ?, is_profile_visible = 1, status = ?, \
    ban_started_at = NULL, banned_by = NULL, ban_duration_days = NULL, ban_expires_at = NULL, \
    archived_display_name = NULL, archived_profile_image = NULL, archived_at = NULL, \
    archived_status = NULL, \
    revision = revision + 1, updated_at = ? \
    WHERE id = ? AND revision = ?";

const COMMIT_RESTRICTION_SQL: &str = "UPDATE users SET \
    chat_restricted = 1, chat_restricted_at = ?, chat_restricted_by = ?, \
    chat_restriction_expires_at = ?, chat_restriction_reason = ?, \
    chat_restriction_duration = ?, chat_restriction_duration_type = ?, \
    revision = revision + 1, updated_at = ? \
    WHERE id = ? AND revision = ?";

const COMMIT_RESTRICTION_LIFT_SQL: &str = "UPDATE users SET \
    chat_restricted = 0, chat_restricted_at = NULL, chat_restricted_by = NULL, \
    chat_restriction_expires_at = NULL, chat_restriction_reason = NULL, \
    chat_restriction_duration = NULL, chat_restriction_duration_type = NULL, \
    revision = revision + 1, updated_at = ? \
    WHERE id = ? AND revision = ?";

impl ModerationDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new active user created at `now`.
    pub async fn create_user(
        &self,
        user: &NewUser<'_>,
        now: i64,
    ) -> Result<UserAccount, DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, display_name, profile_image, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(user.display_name)
        .bind(user.profile_image)
        .bind(AccountStatus::Active)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(user.id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<UserAccount, DatabaseError> {
        sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Set the account status outside the punishment flow (e.g. deactivation).
    pub async fn set_user_status(
        &self,
        id: &str,
        status: AccountStatus,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET status = ?, revision = revision + 1, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Conditional punishment writes
    // =========================================================================

    /// Archive the profile, mark the user banned and hide their content.
    pub async fn commit_ban(&self, params: &BanParams<'_>) -> Result<CommitOutcome, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(COMMIT_BAN_SQL)
            .bind(AccountStatus::Banned)
            .bind(params.now)
            .bind(params.banned_by)
            .bind(params.duration_days)
            .bind(params.expires_at)
            .bind(params.archived_display_name)
            .bind(params.archived_profile_image)
            .bind(params.archived_at)
            .bind(params.archived_status)
            .bind(params.now)
            .bind(params.user_id)
            .bind(params.expected_revision)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::Conflict);
        }

        let content_rows = cascade_content_visibility(&mut tx, params.user_id, true).await;
        tx.commit().await?;

        Ok(CommitOutcome::Applied { content_rows })
    }

    /// Restore the profile and prior status, clear ban and archive fields and
    /// unhide content.
    pub async fn commit_ban_lift(
        &self,
        params: &BanLiftParams<'_>,
    ) -> Result<CommitOutcome, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(COMMIT_BAN_LIFT_SQL)
            .bind(params.display_name)
            .bind(params.profile_image)
            .bind(params.status)
            .bind(params.now)
            .bind(params.user_id)
            .bind(params.expected_revision)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::Conflict);
        }

        let content_rows = cascade_content_visibility(&mut tx, params.user_id, false).await;
        tx.commit().await?;

        Ok(CommitOutcome::Applied { content_rows })
    }

    /// Set the chat-restriction fields. Content is left untouched.
    pub async fn commit_chat_restriction(
        &self,
        params: &RestrictionParams<'_>,
    ) -> Result<CommitOutcome, DatabaseError> {
        let result = sqlx::query(COMMIT_RESTRICTION_SQL)
            .bind(params.now)
            .bind(params.restricted_by)
            .bind(params.expires_at)
            .bind(params.reason)
            .bind(params.duration)
            .bind(params.unit)
            .bind(params.now)
            .bind(params.user_id)
            .bind(params.expected_revision)
            .execute(self.pool())
            .await?;

        Ok(applied_or_conflict(result.rows_affected()))
    }

    /// Clear every chat-restriction field.
    pub async fn commit_chat_restriction_lift(
        &self,
        user_id: &str,
        expected_revision: i64,
        now: i64,
    ) -> Result<CommitOutcome, DatabaseError> {
        let result = sqlx::query(COMMIT_RESTRICTION_LIFT_SQL)
            .bind(now)
            .bind(user_id)
            .bind(expected_revision)
            .execute(self.pool())
            .await?;

        Ok(applied_or_conflict(result.rows_affected()))
    }
}

const fn applied_or_conflict(rows: u64) -> CommitOutcome {
    if rows == 0 {
        CommitOutcome::Conflict
    } else {
        CommitOutcome::Applied { content_rows: 0 }
    }
}

/// Flip `is_hidden` on all of a user's content inside an open transaction.
///
/// A failure here is logged and skipped; the account change still commits.
async fn cascade_content_visibility(
    tx: &mut Transaction<'_, Sqlite>,
    owner_id: &str,
    hidden: bool,
) -> u64 {
    match sqlx::query("UPDATE content_items SET is_hidden = ? WHERE owner_id = ?")
        .bind(hidden)
        .bind(owner_id)
        .execute(&mut **tx)
        .await
    {
        Ok(result) => result.rows_affected(),
        Err(e) => {
            warn!(
                user_id = %owner_id,
                hidden,
                error = %e,
                "Content visibility cascade failed, keeping account change"
            );
            0
        }
    }
}

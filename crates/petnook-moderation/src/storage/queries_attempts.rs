//! Attempt ledger queries.

use petnook_core::db::DatabaseError;

use super::db::ModerationDatabase;
use super::models::{ActionKind, AttemptRecord, LedgerChange};

impl ModerationDatabase {
    /// Append one attempt to the ledger.
    pub async fn insert_attempt(
        &self,
        action: ActionKind,
        identifier: &str,
        success: Option<bool>,
        occurred_at: i64,
    ) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO auth_attempts (action, identifier, success, occurred_at) VALUES (?, ?, ?, ?)",
        )
        .bind(action)
        .bind(identifier)
        .bind(success)
        .bind(occurred_at)
        .execute(self.pool())
        .await?;

        self.publish_ledger_change(LedgerChange {
            action,
            identifier: identifier.to_string(),
        });

        Ok(result.last_insert_rowid())
    }

    /// All attempts for `(action, identifier)`, oldest first.
    ///
    /// Filtering by window and outcome is left to the caller so the table
    /// only needs the `(action, identifier)` index.
    pub async fn list_attempts(
        &self,
        action: ActionKind,
        identifier: &str,
    ) -> Result<Vec<AttemptRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, AttemptRecord>(
            "SELECT * FROM auth_attempts WHERE action = ? AND identifier = ? ORDER BY occurred_at ASC, id ASC",
        )
        .bind(action)
        .bind(identifier)
        .fetch_all(self.pool())
        .await?;

        Ok(records)
    }

    /// Delete every failed or outcome-less attempt for `(action, identifier)`
    /// in one transaction. Successful attempts are kept.
    ///
    /// Returns the number of rows removed; nothing is committed when there is
    /// nothing to remove.
    pub async fn delete_failed_attempts(
        &self,
        action: ActionKind,
        identifier: &str,
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let (pending,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM auth_attempts \
             WHERE action = ? AND identifier = ? AND (success IS NULL OR success = 0)",
        )
        .bind(action)
        .bind(identifier)
        .fetch_one(&mut *tx)
        .await?;

        if pending == 0 {
            tx.rollback().await?;
            return Ok(0);
        }

        let result = sqlx::query(
            "DELETE FROM auth_attempts \
             WHERE action = ? AND identifier = ? AND (success IS NULL OR success = 0)",
        )
        .bind(action)
        .bind(identifier)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.publish_ledger_change(LedgerChange {
            action,
            identifier: identifier.to_string(),
        });

        Ok(result.rows_affected())
    }
}

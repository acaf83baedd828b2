//! Notification queries.
//!
//! Rows written here are picked up by the push companion, which forwards new
//! notifications to the user's devices.

use petnook_core::db::DatabaseError;

use super::db::ModerationDatabase;
use super::models::NotificationEvent;

/// Parameters for inserting a notification.
pub struct NotificationParams<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub kind: &'a str,
    /// JSON object of string values.
    pub data: &'a str,
    pub created_at: i64,
}

impl ModerationDatabase {
    // =========================================================================
    // Notification queries
    // =========================================================================

    /// Insert an unread notification.
    pub async fn insert_notification(
        &self,
        params: &NotificationParams<'_>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, body, kind, data, is_read, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(params.id)
        .bind(params.user_id)
        .bind(params.title)
        .bind(params.body)
        .bind(params.kind)
        .bind(params.data)
        .bind(params.created_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Most recent notification for `(user_id, title, kind)`, if any.
    pub async fn latest_notification(
        &self,
        user_id: &str,
        title: &str,
        kind: &str,
    ) -> Result<Option<NotificationEvent>, DatabaseError> {
        let event = sqlx::query_as::<_, NotificationEvent>(
            "SELECT * FROM notifications WHERE user_id = ? AND title = ? AND kind = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(title)
        .bind(kind)
        .fetch_optional(self.pool())
        .await?;

        Ok(event)
    }

    /// All notifications for a user, newest first.
    pub async fn list_notifications_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationEvent>, DatabaseError> {
        let events = sqlx::query_as::<_, NotificationEvent>(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    /// Mark a notification as read. Returns `false` if it does not exist.
    pub async fn mark_notification_read(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn test_db() -> ModerationDatabase {
        ModerationDatabase::open_in_memory().await.unwrap()
    }

    fn params<'a>(id: &'a str, body: &'a str, created_at: i64) -> NotificationParams<'a> {
        NotificationParams {
            id,
            user_id: "user-1",
            title: "Account suspended",
            body,
            kind: "admin_action",
            data: "{}",
            created_at,
        }
    }

    #[tokio::test]
    async fn latest_notification_picks_newest() {
        let db = test_db().await;

        db.insert_notification(&params("n1", "first", 100)).await.unwrap();
        db.insert_notification(&params("n2", "second", 200)).await.unwrap();

        let latest = db
            .latest_notification("user-1", "Account suspended", "admin_action")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, "n2");
        assert_eq!(latest.body, "second");
    }

    #[tokio::test]
    async fn latest_notification_filters_by_kind() {
        let db = test_db().await;

        let mut other = params("n1", "hello", 100);
        other.kind = "social";
        db.insert_notification(&other).await.unwrap();

        let latest = db
            .latest_notification("user-1", "Account suspended", "admin_action")
            .await
            .unwrap();
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn mark_read() {
        let db = test_db().await;
        db.insert_notification(&params("n1", "body", 100)).await.unwrap();

        assert!(db.mark_notification_read("n1").await.unwrap());
        assert!(!db.mark_notification_read("missing").await.unwrap());

        let all = db.list_notifications_for_user("user-1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_read);
    }
}

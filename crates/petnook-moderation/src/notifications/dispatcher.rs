//! Notification dispatcher with short-window de-duplication.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use petnook_core::Clock;

use super::{Message, NotificationError, SendOutcome};
use crate::storage::{ADMIN_ACTION_KIND, ModerationDatabase, NotificationEvent, NotificationParams};

/// Writes admin-action notifications for users.
#[derive(Clone)]
pub struct NotificationDispatcher {
    db: ModerationDatabase,
    clock: Arc<dyn Clock>,
    dedup_window_secs: i64,
}

impl NotificationDispatcher {
    pub fn new(db: ModerationDatabase, clock: Arc<dyn Clock>, dedup_window_secs: i64) -> Self {
        Self {
            db,
            clock,
            dedup_window_secs,
        }
    }

    /// Send a notification to `user_id`.
    ///
    /// Skipped when the newest admin notification with the same title has the
    /// same body and is younger than the de-duplication window. Errors are
    /// logged and reported as [`SendOutcome::Failed`].
    #[instrument(skip(self, body, data))]
    pub async fn send(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: Option<HashMap<String, String>>,
    ) -> SendOutcome {
        match self.try_send(user_id, title, body, data).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to send notification");
                SendOutcome::Failed
            }
        }
    }

    /// Send a prepared [`Message`].
    pub async fn send_message(&self, user_id: &str, message: Message) -> SendOutcome {
        self.send(user_id, &message.title, &message.body, Some(message.data))
            .await
    }

    async fn try_send(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: Option<HashMap<String, String>>,
    ) -> Result<SendOutcome, NotificationError> {
        let now = self.clock.now();

        let duplicate = self
            .db
            .latest_notification(user_id, title, ADMIN_ACTION_KIND)
            .await?
            .filter(|prev| prev.body == body && now - prev.created_at < self.dedup_window_secs);

        if let Some(previous) = duplicate {
            debug!(
                user_id = %user_id,
                previous_id = %previous.id,
                "Dropping duplicate notification"
            );
            return Ok(SendOutcome::Duplicate);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let data = serde_json::to_string(&data.unwrap_or_default())?;

        self.db
            .insert_notification(&NotificationParams {
                id: &id,
                user_id,
                title,
                body,
                kind: ADMIN_ACTION_KIND,
                data: &data,
                created_at: now,
            })
            .await?;

        debug!(user_id = %user_id, notification_id = %id, "Notification created");
        Ok(SendOutcome::Created(id))
    }

    /// Notifications for a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationEvent>, NotificationError> {
        Ok(self.db.list_notifications_for_user(user_id).await?)
    }

    /// Mark one notification as read. Returns `false` if it does not exist.
    pub async fn mark_read(&self, id: &str) -> Result<bool, NotificationError> {
        Ok(self.db.mark_notification_read(id).await?)
    }
}

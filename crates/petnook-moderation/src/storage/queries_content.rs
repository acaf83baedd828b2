//! Content item queries (posts and pets).

use petnook_core::db::DatabaseError;

use super::db::ModerationDatabase;
use super::models::{ContentItem, ContentKind};

impl ModerationDatabase {
    /// Register a content item owned by a user. New items are visible.
    pub async fn create_content(
        &self,
        id: &str,
        owner_id: &str,
        kind: ContentKind,
        now: i64,
    ) -> Result<ContentItem, DatabaseError> {
        sqlx::query(
            "INSERT INTO content_items (id, owner_id, kind, is_hidden, created_at) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(id)
        .bind(owner_id)
        .bind(kind)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_content(id).await
    }

    /// Get a content item by ID.
    pub async fn get_content(&self, id: &str) -> Result<ContentItem, DatabaseError> {
        sqlx::query_as::<_, ContentItem>("SELECT * FROM content_items WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Content {id}")))
    }

    /// All content owned by a user, oldest first.
    pub async fn list_content_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<ContentItem>, DatabaseError> {
        let items = sqlx::query_as::<_, ContentItem>(
            "SELECT * FROM content_items WHERE owner_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;

        Ok(items)
    }
}

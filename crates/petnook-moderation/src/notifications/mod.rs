//! In-app notifications for moderation actions.
//!
//! This module provides:
//! - [`NotificationDispatcher`] which writes notification rows, dropping
//!   near-identical messages sent in quick succession
//! - [`messages`] with the user-facing text for each moderation event
//!
//! Delivery to devices is handled elsewhere; it picks up the rows written here.

mod dispatcher;
pub mod messages;

pub use dispatcher::NotificationDispatcher;
pub use messages::Message;

/// Errors that can occur in the notification subsystem.
///
/// [`NotificationDispatcher::send`] never returns these; they are logged.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The data payload could not be encoded.
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<petnook_core::db::DatabaseError> for NotificationError {
    fn from(e: petnook_core::db::DatabaseError) -> Self {
        Self::Database(e.to_string())
    }
}

/// What happened to a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// A notification row was written with this ID.
    Created(String),
    /// An identical notification was sent moments ago; nothing was written.
    Duplicate,
    /// The send failed and was logged.
    Failed,
}

impl SendOutcome {
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

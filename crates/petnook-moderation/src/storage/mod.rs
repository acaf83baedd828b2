//! `SQLite` storage for moderation state.
//!
//! Provides persistence for the attempt ledger, punishment fields on user
//! accounts, user-owned content visibility, and in-app notifications.

mod db;
mod models;
mod queries_attempts;
mod queries_content;
mod queries_notifications;
mod queries_users;

#[cfg(test)]
mod tests;

pub use db::ModerationDatabase;
pub use models::*;
pub use petnook_core::db::DatabaseError;
pub use queries_notifications::NotificationParams;
pub use queries_users::{BanLiftParams, BanParams, RestrictionParams};

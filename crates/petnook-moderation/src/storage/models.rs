//! Data models for moderation storage.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Authentication-related action guarded by the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActionKind {
    Login,
    Signup,
    EmailVerification,
}

impl ActionKind {
    pub const ALL: [Self; 3] = [Self::Login, Self::Signup, Self::EmailVerification];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::EmailVerification => "email_verification",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action kind: {s}"))
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Deactivated,
    Banned,
}

impl AccountStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deactivated => "deactivated",
            Self::Banned => "banned",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unit of a chat-restriction duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DurationUnit {
    Hours,
    Days,
}

impl DurationUnit {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }

    pub const fn secs(self) -> i64 {
        match self {
            Self::Hours => petnook_core::clock::SECS_PER_HOUR,
            Self::Days => petnook_core::clock::SECS_PER_DAY,
        }
    }

    /// Singular or plural label for a count, e.g. `1 hour`, `3 days`.
    pub fn label(self, count: i64) -> String {
        let unit = match (self, count) {
            (Self::Hours, 1) => "hour",
            (Self::Hours, _) => "hours",
            (Self::Days, 1) => "day",
            (Self::Days, _) => "days",
        };
        format!("{count} {unit}")
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            other => Err(format!("unknown duration unit: {other}")),
        }
    }
}

/// Kind of user-owned content hidden while its owner is banned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Pet,
}

/// One authentication attempt in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttemptRecord {
    pub id: i64,
    pub action: ActionKind,
    pub identifier: String,
    /// `None` for legacy rows written without an outcome.
    pub success: Option<bool>,
    pub occurred_at: i64,
}

impl AttemptRecord {
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }
}

/// Punishment-relevant subset of a user account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAccount {
    pub id: String,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
    pub is_profile_visible: bool,
    pub status: AccountStatus,

    pub ban_started_at: Option<i64>,
    pub banned_by: Option<String>,
    pub ban_duration_days: Option<i64>,
    pub ban_expires_at: Option<i64>,

    pub archived_display_name: Option<String>,
    pub archived_profile_image: Option<String>,
    pub archived_at: Option<i64>,
    pub archived_status: Option<AccountStatus>,

    pub chat_restricted: bool,
    pub chat_restricted_at: Option<i64>,
    pub chat_restricted_by: Option<String>,
    pub chat_restriction_expires_at: Option<i64>,
    pub chat_restriction_reason: Option<String>,
    pub chat_restriction_duration: Option<i64>,
    pub chat_restriction_duration_type: Option<DurationUnit>,

    /// Bumped by every punishment write; used for conditional updates.
    pub revision: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Identity fields snapshotted while a user is banned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedProfile {
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
    pub archived_at: i64,
    /// Status before the ban. Rows archived without one restore as active.
    pub status: AccountStatus,
}

impl UserAccount {
    pub fn archived_profile(&self) -> Option<ArchivedProfile> {
        self.archived_at.map(|archived_at| ArchivedProfile {
            display_name: self.archived_display_name.clone(),
            profile_image: self.archived_profile_image.clone(),
            archived_at,
            status: self
                .archived_status
                .filter(|s| *s != AccountStatus::Banned)
                .unwrap_or(AccountStatus::Active),
        })
    }
}

/// Parameters for creating a user row.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub display_name: Option<&'a str>,
    pub profile_image: Option<&'a str>,
}

/// A post or pet owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItem {
    pub id: String,
    pub owner_id: String,
    pub kind: ContentKind,
    pub is_hidden: bool,
    pub created_at: i64,
}

/// Kind tag stored on notifications written by moderation actions.
pub const ADMIN_ACTION_KIND: &str = "admin_action";

/// In-app notification row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationEvent {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub kind: String,
    /// JSON object of string values.
    pub data: String,
    pub is_read: bool,
    pub created_at: i64,
}

impl NotificationEvent {
    pub fn data_map(&self) -> HashMap<String, String> {
        serde_json::from_str(&self.data).unwrap_or_default()
    }
}

/// Published on the ledger change feed after each successful ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    pub action: ActionKind,
    pub identifier: String,
}

/// Result of a conditional (revision-checked) user write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The write landed; `content_rows` items had their visibility changed.
    Applied { content_rows: u64 },
    /// The user row changed since it was read; nothing was written.
    Conflict,
}

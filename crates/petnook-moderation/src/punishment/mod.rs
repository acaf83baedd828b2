//! User punishment state machine.
//!
//! A user has two independent, time-boxed punishment axes: an account ban and
//! a chat restriction. Neither is ever cleared by a timer. Whether one is in
//! force is recomputed from `(flag, expires_at, now)` on every read, see
//! [`expiry`].

pub mod expiry;
mod service;


use std::fmt;

use serde::Serialize;

pub use service::PunishmentService;

use crate::notifications::messages::format_timestamp;
use crate::storage::{DatabaseError, DurationUnit, UserAccount};

/// The two punishment axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PunishmentKind {
    Ban,
    ChatRestriction,
}

impl PunishmentKind {
    /// Adjective used in user-facing messages.
    pub const fn state_label(self) -> &'static str {
        match self {
            Self::Ban => "banned",
            Self::ChatRestriction => "chat restricted",
        }
    }
}

impl fmt::Display for PunishmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ban => write!(f, "ban"),
            Self::ChatRestriction => write!(f, "chat restriction"),
        }
    }
}

/// Errors from punishment operations.
#[derive(Debug, thiserror::Error)]
pub enum PunishmentError {
    /// Bad input, rejected before anything was read.
    #[error("{0}")]
    Validation(String),

    #[error("user {0} not found")]
    UserNotFound(String),

    /// An unexpired punishment is already in force. Nothing was written.
    #[error("already {} until {}", .kind.state_label(), until_label(.until))]
    AlreadyPunished { kind: PunishmentKind, until: i64 },

    /// The user kept changing underneath the operation.
    #[error("user {0} was modified concurrently, try again")]
    Conflict(String),

    #[error("storage error: {0}")]
    Store(#[from] DatabaseError),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn until_label(ts: &i64) -> String {
    format_timestamp(*ts)
}

/// Result of a successful ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BanApplied {
    pub expires_at: i64,
    /// Content items hidden by the cascade.
    pub hidden_items: u64,
}

/// Result of a successful chat restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionApplied {
    pub expires_at: i64,
}

/// Result of a lift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftOutcome {
    /// Fields were cleared. For bans, `restored_items` content items were
    /// made visible again.
    Lifted { restored_items: u64 },
    /// There was nothing to lift; nothing was written.
    NotPunished,
}

/// An account ban in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveBan {
    pub started_at: Option<i64>,
    pub banned_by: Option<String>,
    pub duration_days: Option<i64>,
    pub expires_at: i64,
}

/// A chat restriction in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveRestriction {
    pub restricted_by: Option<String>,
    pub reason: Option<String>,
    pub duration: Option<i64>,
    pub unit: Option<DurationUnit>,
    pub expires_at: i64,
}

/// Effective punishment state of a user at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PunishmentStatus {
    pub ban: Option<ActiveBan>,
    pub chat_restriction: Option<ActiveRestriction>,
}

impl PunishmentStatus {
    /// Evaluate both axes of `user` at `now`. Expired state reads as absent.
    pub fn of(user: &UserAccount, now: i64) -> Self {
        let ban = user.ban_active_until(now).map(|expires_at| ActiveBan {
            started_at: user.ban_started_at,
            banned_by: user.banned_by.clone(),
            duration_days: user.ban_duration_days,
            expires_at,
        });
        let chat_restriction =
            user.chat_restriction_active_until(now)
                .map(|expires_at| ActiveRestriction {
                    restricted_by: user.chat_restricted_by.clone(),
                    reason: user.chat_restriction_reason.clone(),
                    duration: user.chat_restriction_duration,
                    unit: user.chat_restriction_duration_type,
                    expires_at,
                });
        Self {
            ban,
            chat_restriction,
        }
    }

    pub const fn is_clear(&self) -> bool {
        self.ban.is_none() && self.chat_restriction.is_none()
    }
}

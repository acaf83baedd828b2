//! Lazy expiry predicates.
//!
//! Stored flags are never cleared when a punishment runs out, so every read
//! site must go through these instead of trusting the flag.

use crate::storage::{AccountStatus, UserAccount};

/// A ban is in force while the account is marked banned and the expiry is
/// still in the future.
pub fn is_ban_active(status: AccountStatus, expires_at: Option<i64>, now: i64) -> bool {
    status == AccountStatus::Banned && expires_at.is_some_and(|at| at > now)
}

pub fn is_chat_restriction_active(restricted: bool, expires_at: Option<i64>, now: i64) -> bool {
    restricted && expires_at.is_some_and(|at| at > now)
}

impl UserAccount {
    pub fn is_ban_active(&self, now: i64) -> bool {
        is_ban_active(self.status, self.ban_expires_at, now)
    }

    pub fn is_chat_restriction_active(&self, now: i64) -> bool {
        is_chat_restriction_active(self.chat_restricted, self.chat_restriction_expires_at, now)
    }

    /// Expiry of the ban in force at `now`, if any.
    pub fn ban_active_until(&self, now: i64) -> Option<i64> {
        self.ban_expires_at.filter(|_| self.is_ban_active(now))
    }

    /// Expiry of the chat restriction in force at `now`, if any.
    pub fn chat_restriction_active_until(&self, now: i64) -> Option<i64> {
        self.chat_restriction_expires_at
            .filter(|_| self.is_chat_restriction_active(now))
    }

    /// Whether the row still carries ban state worth clearing, expired or not.
    pub fn has_ban_state(&self) -> bool {
        self.status == AccountStatus::Banned || self.archived_at.is_some()
    }

    pub fn has_chat_restriction_state(&self) -> bool {
        self.chat_restricted || self.chat_restriction_expires_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ban_requires_status_and_future_expiry() {
        assert!(is_ban_active(AccountStatus::Banned, Some(101), 100));
        assert!(!is_ban_active(AccountStatus::Banned, Some(100), 100));
        assert!(!is_ban_active(AccountStatus::Banned, None, 100));
        assert!(!is_ban_active(AccountStatus::Active, Some(500), 100));
    }

    #[test]
    fn restriction_requires_flag_and_future_expiry() {
        assert!(is_chat_restriction_active(true, Some(101), 100));
        assert!(!is_chat_restriction_active(true, Some(99), 100));
        assert!(!is_chat_restriction_active(false, Some(500), 100));
    }
}

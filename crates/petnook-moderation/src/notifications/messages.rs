//! User-facing text for moderation notifications.

use std::collections::HashMap;

use chrono::DateTime;

use crate::storage::DurationUnit;

/// A notification ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

impl Message {
    fn new(title: &str, body: String, event: &str) -> Self {
        Self {
            title: title.to_string(),
            body,
            data: HashMap::from([("event".to_string(), event.to_string())]),
        }
    }

    #[must_use]
    fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }
}

pub const BAN_APPLIED_TITLE: &str = "Account suspended";
pub const BAN_LIFTED_TITLE: &str = "Account restored";
pub const CHAT_RESTRICTED_TITLE: &str = "Chat restricted";
pub const CHAT_RESTRICTION_LIFTED_TITLE: &str = "Chat restriction lifted";

/// Render a Unix timestamp as `YYYY-MM-DD HH:MM UTC`.
pub fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0).map_or_else(
        || ts.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

pub fn ban_applied(duration_days: i64, expires_at: i64) -> Message {
    let body = format!(
        "Your account has been suspended for {} due to a violation of the community \
         guidelines. The suspension ends on {}.",
        DurationUnit::Days.label(duration_days),
        format_timestamp(expires_at),
    );
    Message::new(BAN_APPLIED_TITLE, body, "ban_applied")
        .with("duration_days", duration_days)
        .with("expires_at", expires_at)
}

pub fn ban_lifted() -> Message {
    Message::new(
        BAN_LIFTED_TITLE,
        "Your account suspension has been lifted. Your profile and content are visible again."
            .to_string(),
        "ban_lifted",
    )
}

pub fn chat_restricted(
    duration: i64,
    unit: DurationUnit,
    reason: &str,
    expires_at: i64,
) -> Message {
    let body = format!(
        "You cannot send messages for {}. Reason: {reason}. The restriction ends on {}.",
        unit.label(duration),
        format_timestamp(expires_at),
    );
    Message::new(CHAT_RESTRICTED_TITLE, body, "chat_restricted")
        .with("duration", duration)
        .with("duration_type", unit)
        .with("reason", reason)
        .with("expires_at", expires_at)
}

pub fn chat_restriction_lifted() -> Message {
    Message::new(
        CHAT_RESTRICTION_LIFTED_TITLE,
        "Your chat restriction has been lifted. You can send messages again.".to_string(),
        "chat_restriction_lifted",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00 UTC");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13 UTC");
    }

    #[test]
    fn ban_message_names_duration_and_end() {
        let msg = ban_applied(3, 259_200);
        assert_eq!(msg.title, BAN_APPLIED_TITLE);
        assert!(msg.body.contains("3 days"));
        assert!(msg.body.contains("1970-01-04 00:00 UTC"));
        assert_eq!(msg.data.get("event").map(String::as_str), Some("ban_applied"));
        assert_eq!(msg.data.get("duration_days").map(String::as_str), Some("3"));
    }

    #[test]
    fn restriction_message_names_reason_and_unit() {
        let msg = chat_restricted(1, DurationUnit::Hours, "spam", 3_600);
        assert!(msg.body.contains("1 hour"));
        assert!(msg.body.contains("Reason: spam"));
        assert_eq!(msg.data.get("duration_type").map(String::as_str), Some("hours"));
    }
}

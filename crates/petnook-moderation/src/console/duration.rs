//! Parsing of human-entered punishment durations.

use crate::storage::DurationUnit;

use super::ConsoleError;

/// A parsed duration such as `3d` or `12h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration {
    pub amount: i64,
    pub unit: DurationUnit,
}

/// Parse `"3"`, `"3d"`, `"12h"`, `"2 days"` and similar.
///
/// A bare number takes `default_unit`.
pub fn parse_duration(input: &str, default_unit: DurationUnit) -> Result<HumanDuration, ConsoleError> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, suffix) = input.split_at(split);

    let amount: i64 = digits
        .parse()
        .map_err(|_| ConsoleError::InvalidDuration(input.to_string()))?;
    if amount <= 0 {
        return Err(ConsoleError::InvalidDuration(input.to_string()));
    }

    let unit = if suffix.trim().is_empty() {
        default_unit
    } else {
        suffix
            .parse()
            .map_err(|_| ConsoleError::InvalidDuration(input.to_string()))?
    };

    Ok(HumanDuration { amount, unit })
}

/// Parse a ban duration. Bans are counted in days only.
pub fn parse_ban_days(input: &str) -> Result<i64, ConsoleError> {
    match parse_duration(input, DurationUnit::Days)? {
        HumanDuration {
            amount,
            unit: DurationUnit::Days,
        } => Ok(amount),
        HumanDuration { .. } => Err(ConsoleError::InvalidDuration(format!(
            "{} (bans are set in days)",
            input.trim()
        ))),
    }
}

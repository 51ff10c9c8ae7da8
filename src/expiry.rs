//! Token expiry specifications.
//!
//! An expiry can be given as seconds from now, as a relative shorthand
//! (`"24hrs"`, `"30mns"`, `"1 hour"`, `"90s"`, `"7d"`) or as an absolute date.
//! Naive dates without an offset are interpreted as UTC.

use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};

use crate::error::{CryptError, Result};

/// Largest relative window accepted, in milliseconds (about 10 000 years).
const MAX_RELATIVE_MS: f64 = 315_576_000_000_000.0;

/// When a token stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySpec {
    /// Relative to the moment the token is created. May be negative.
    In(TimeDelta),
    /// An absolute point in time.
    At(DateTime<Utc>),
}

impl ExpirySpec {
    pub fn seconds(secs: i64) -> Result<Self> {
        TimeDelta::try_seconds(secs)
            .map(ExpirySpec::In)
            .ok_or_else(|| CryptError::InvalidExpirySpec(secs.to_string()))
    }

    /// Resolves the spec to an absolute timestamp against `now`.
    ///
    /// The result must fall in years 0000 to 9999, the range an RFC 3339
    /// timestamp can express.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let at = match self {
            ExpirySpec::In(delta) => now
                .checked_add_signed(*delta)
                .ok_or_else(|| CryptError::InvalidExpirySpec(format!("{delta} from {now}")))?,
            ExpirySpec::At(at) => *at,
        };
        if !(0..=9999).contains(&at.year()) {
            return Err(CryptError::InvalidExpirySpec(format!(
                "{} is outside years 0000..=9999",
                format_timestamp(&at)
            )));
        }
        Ok(at)
    }
}

impl From<DateTime<Utc>> for ExpirySpec {
    fn from(at: DateTime<Utc>) -> Self {
        ExpirySpec::At(at)
    }
}

impl From<TimeDelta> for ExpirySpec {
    fn from(delta: TimeDelta) -> Self {
        ExpirySpec::In(delta)
    }
}

impl FromStr for ExpirySpec {
    type Err = CryptError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Err(CryptError::InvalidExpirySpec(s.to_string()));
        }
        if let Some(delta) = parse_relative(text) {
            return delta.map(ExpirySpec::In);
        }
        parse_absolute(text)
            .map(ExpirySpec::At)
            .ok_or_else(|| CryptError::InvalidExpirySpec(s.to_string()))
    }
}

/// Multiplier in seconds for a shorthand unit.
fn unit_seconds(unit: &str) -> Option<f64> {
    let secs = match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "mn" | "mns" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600.0,
        "d" | "day" | "days" => 86_400.0,
        _ => return None,
    };
    Some(secs)
}

/// `None` means "not a relative spec at all"; `Some(Err)` means it looked
/// like one but the amount is unusable.
fn parse_relative(text: &str) -> Option<Result<TimeDelta>> {
    let split = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (amount, unit) = text.split_at(split);
    let secs_per_unit = unit_seconds(&unit.trim().to_ascii_lowercase())?;

    let invalid = || CryptError::InvalidExpirySpec(text.to_string());
    let amount: f64 = match amount.parse() {
        Ok(n) => n,
        Err(_) => return Some(Err(invalid())),
    };
    let millis = amount * secs_per_unit * 1_000.0;
    if !millis.is_finite() || millis.abs() > MAX_RELATIVE_MS {
        return Some(Err(invalid()));
    }
    Some(TimeDelta::try_milliseconds(millis.round() as i64).ok_or_else(invalid))
}

fn parse_absolute(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Canonical text form of an expiry timestamp inside a token.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

//! Effective dates for documents.
//!
//! A document's date drives its date-derived permalink segments and the
//! future-dated publishing gate. It comes from, in order:
//!
//! 1. A `date` key in the merged front matter.
//! 2. A `YYYY-MM-DD-` filename prefix (posts only).
//! 3. The file's modification time.
//!
//! Dates without an explicit offset are read in the site's configured
//! offset (UTC unless `timezone` names a fixed offset).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::time::SystemTime;

/// Where a document's effective date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    FrontMatter,
    Filename,
    ModTime,
}

impl DateSource {
    /// True for dates the author wrote down, as opposed to filesystem times.
    pub fn is_explicit(self) -> bool {
        !matches!(self, DateSource::ModTime)
    }
}

/// A resolved document date and its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveDate {
    pub value: DateTime<FixedOffset>,
    pub source: DateSource,
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S %:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M %z",
];

/// Parse a front-matter style date string.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS] [+ZZZZ]`, and bare `YYYY-MM-DD`.
/// Values without an offset are interpreted in `offset`.
pub fn parse_date(s: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return offset.from_local_datetime(&naive).single();
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    at_midnight(date, offset)
}

/// A date value from front matter. Only strings carry dates.
pub fn date_from_value(value: &Value, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    value.as_str().and_then(|s| parse_date(s, offset))
}

/// Midnight of `date` in `offset`.
pub fn at_midnight(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    offset.from_local_datetime(&naive).single()
}

/// A filesystem timestamp shown in `offset`.
pub fn from_system_time(time: SystemTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from(time).with_timezone(&offset)
}

/// Parse `+HH:MM`, `+HHMM`, or `+HH` (and the `-` forms).
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

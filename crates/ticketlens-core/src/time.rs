//! Timestamp parsing and display in a fixed UTC offset
//!
//! Ticket text rarely carries a timezone, so naive values are interpreted in
//! the configured offset. Relative words (今天, 刚才, 昨天) are anchored on
//! the caller-supplied `now`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Display format used for window bounds
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

static OFFSET_RE: OnceLock<Regex> = OnceLock::new();
static RELATIVE_RE: OnceLock<Regex> = OnceLock::new();

/// Parse a UTC offset such as `+08:00`, `-0530`, `Z` or `UTC`
pub fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| Error::InvalidOffset(raw.to_string()));
    }

    let re = OFFSET_RE.get_or_init(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})$").unwrap());
    let cap = re
        .captures(trimmed)
        .ok_or_else(|| Error::InvalidOffset(raw.to_string()))?;

    let hours: i32 = cap[2].parse().map_err(|_| Error::InvalidOffset(raw.to_string()))?;
    let minutes: i32 = cap[3].parse().map_err(|_| Error::InvalidOffset(raw.to_string()))?;
    let mut seconds = hours * 3600 + minutes * 60;
    if &cap[1] == "-" {
        seconds = -seconds;
    }

    FixedOffset::east_opt(seconds).ok_or_else(|| Error::InvalidOffset(raw.to_string()))
}

/// Parse a timestamp as it appears in ticket text or on the command line.
///
/// Accepted shapes, in order: relative words with an optional clock time,
/// epoch seconds/millis/micros/nanos, RFC 3339, naive date-times, bare dates, and
/// bare clock times (taken as today).
pub fn parse_timestamp(
    raw: &str,
    offset: FixedOffset,
    now: DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let today = now.with_timezone(&offset).date_naive();

    if let Some(parsed) = parse_relative(value, offset, now, today) {
        return Some(parsed);
    }

    if value.chars().all(|c| c.is_ascii_digit()) {
        return parse_epoch(value, offset);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }

    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return localize(naive, offset);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return localize(date.and_hms_opt(0, 0, 0)?, offset);
        }
    }

    for fmt in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(value, fmt) {
            return localize(today.and_time(time), offset);
        }
    }

    None
}

/// Like [`parse_timestamp`] but reports unparseable input as an error
pub fn parse_explicit(
    raw: &str,
    offset: FixedOffset,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>> {
    parse_timestamp(raw, offset, now).ok_or_else(|| Error::InvalidTime(raw.to_string()))
}

/// Convert epoch milliseconds into the given offset
pub fn from_millis(ms: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(ms).map(|t| t.with_timezone(&offset))
}

/// Render a timestamp in [`DISPLAY_FORMAT`]
pub fn display(t: &DateTime<FixedOffset>) -> String {
    t.format(DISPLAY_FORMAT).to_string()
}

fn parse_relative(
    value: &str,
    offset: FixedOffset,
    now: DateTime<FixedOffset>,
    today: NaiveDate,
) -> Option<DateTime<FixedOffset>> {
    let re = RELATIVE_RE.get_or_init(|| {
        Regex::new(r"^(今天|刚才|刚刚|昨天)\s*(\d{1,2}:\d{2}(?::\d{2})?)?$").unwrap()
    });
    let cap = re.captures(value)?;

    let day = if &cap[1] == "昨天" {
        today.pred_opt()?
    } else {
        today
    };

    match cap.get(2) {
        Some(clock) => {
            let time = TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(clock.as_str(), fmt).ok())?;
            localize(day.and_time(time), offset)
        }
        None if &cap[1] == "昨天" => Some(now.with_timezone(&offset) - Duration::days(1)),
        None => Some(now.with_timezone(&offset)),
    }
}

fn parse_epoch(value: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let n: i64 = value.parse().ok()?;
    let ms = match value.len() {
        10 => n.checked_mul(1000)?,
        13 => n,
        16 => n / 1000,
        19 => n / 1_000_000,
        _ => return None,
    };
    from_millis(ms, offset)
}

fn localize(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset.from_local_datetime(&naive).single()
}

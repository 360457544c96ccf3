//! Temporal scalar parsing.
//!
//! `date`, `time`, and `datetime` values are strings checked against a
//! format; `timestamp` is an integer whose digit count is gated by the
//! `precision` constraint. Formats are either the named defaults
//! (`rfc3339`, `iso8601`) or a strftime-style pattern restricted to
//! `%Y %m %d %H %M %S %I %p %b %B %a %A`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

impl TemporalKind {
    pub fn from_name(name: &str) -> Option<TemporalKind> {
        match name {
            "date" => Some(TemporalKind::Date),
            "time" => Some(TemporalKind::Time),
            "datetime" => Some(TemporalKind::DateTime),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TemporalKind::Date => "date",
            TemporalKind::Time => "time",
            TemporalKind::DateTime => "datetime",
        }
    }
}

/// A parsed temporal value, comparable for `min`/`max` checks.
///
/// Zoned datetimes normalize to UTC before comparison.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum TemporalStamp {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

const CUSTOM_DIRECTIVES: &[char] = &['Y', 'm', 'd', 'H', 'M', 'S', 'I', 'p', 'b', 'B', 'a', 'A'];

/// Schema-time well-formedness check for a `format` constraint value.
pub fn check_format_pattern(pattern: &str) -> Result<(), String> {
    if matches!(pattern, "rfc3339" | "iso8601") {
        return Ok(());
    }
    let mut chars = pattern.chars();
    let mut has_directive = false;
    while let Some(ch) = chars.next() {
        if ch != '%' {
            continue;
        }
        match chars.next() {
            Some('%') => {}
            Some(directive) if CUSTOM_DIRECTIVES.contains(&directive) => {
                has_directive = true;
            }
            Some(directive) => {
                return Err(format!("unsupported format directive '%{directive}'"));
            }
            None => return Err("dangling '%' in format pattern".to_string()),
        }
    }
    if !has_directive {
        return Err(format!("'{pattern}' contains no format directives"));
    }
    Ok(())
}

/// Parse `text` as the given temporal kind. `format` is the `format`
/// constraint value when the schema carries one.
pub fn parse(kind: TemporalKind, text: &str, format: Option<&str>) -> Result<TemporalStamp, String> {
    match kind {
        TemporalKind::Date => parse_date(text, format).map(TemporalStamp::Date),
        TemporalKind::Time => parse_time(text, format).map(TemporalStamp::Time),
        TemporalKind::DateTime => parse_datetime(text, format).map(TemporalStamp::DateTime),
    }
}

fn parse_date(text: &str, format: Option<&str>) -> Result<NaiveDate, String> {
    match format {
        None | Some("rfc3339") | Some("iso8601") => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|_| format!("'{text}' is not a valid date (expected YYYY-MM-DD)")),
        Some(pattern) => NaiveDate::parse_from_str(text, pattern)
            .map_err(|_| format!("'{text}' does not match date format '{pattern}'")),
    }
}

fn parse_time(text: &str, format: Option<&str>) -> Result<NaiveTime, String> {
    match format {
        None | Some("rfc3339") | Some("iso8601") => {
            let pattern = if text.contains('.') {
                "%H:%M:%S%.f"
            } else {
                "%H:%M:%S"
            };
            NaiveTime::parse_from_str(text, pattern)
                .map_err(|_| format!("'{text}' is not a valid time (expected HH:MM:SS[.fff])"))
        }
        Some(pattern) => NaiveTime::parse_from_str(text, pattern)
            .map_err(|_| format!("'{text}' does not match time format '{pattern}'")),
    }
}

fn parse_datetime(text: &str, format: Option<&str>) -> Result<NaiveDateTime, String> {
    match format {
        None | Some("rfc3339") => rfc3339_datetime(text),
        Some("iso8601") => {
            // ISO 8601 additionally allows a space between date and time.
            let normalized = text.replacen(' ', "T", 1);
            rfc3339_datetime(&normalized)
        }
        Some(pattern) => NaiveDateTime::parse_from_str(text, pattern)
            .map_err(|_| format!("'{text}' does not match datetime format '{pattern}'")),
    }
}

fn rfc3339_datetime(text: &str) -> Result<NaiveDateTime, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.naive_utc())
        .map_err(|_| {
            format!("'{text}' is not a valid datetime (expected YYYY-MM-DDThh:mm:ss[.fff]Z or offset)")
        })
}

/// Digit width required by a `timestamp` precision label.
pub fn precision_digits(precision: &str) -> Option<u32> {
    match precision {
        "seconds" => Some(10),
        "milliseconds" => Some(13),
        "microseconds" => Some(16),
        "nanoseconds" => Some(19),
        _ => None,
    }
}

pub fn digit_count(value: i64) -> u32 {
    let mut n = value.unsigned_abs();
    if n == 0 {
        return 1;
    }
    let mut count = 0;
    while n > 0 {
        n /= 10;
        count += 1;
    }
    count
}

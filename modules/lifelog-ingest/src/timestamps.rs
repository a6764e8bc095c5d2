//! Timestamp normalization and date-range helpers.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Layouts that carry no offset and are read as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
    // "Jul 7, 2025 at 10:14 AM"
    "%b %d, %Y at %I:%M %p",
    "%B %d, %Y at %I:%M %p",
    // recorder transcripts: "2025-06-01 08:00:00.000"
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

pub fn parse_rfc3339(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim()).ok()
}

/// Converts a known timestamp layout to RFC 3339. RFC 3339 input is
/// returned unchanged.
pub fn to_iso8601(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if parse_rfc3339(raw).is_some() {
        return Some(raw.to_string());
    }
    NAIVE_LAYOUTS.iter().find_map(|layout| {
        NaiveDateTime::parse_from_str(raw, layout)
            .ok()
            .map(|t| t.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true))
    })
}

/// Best-effort normalization: unparseable values are kept verbatim and a
/// warning names the input they came from.
pub fn normalize_or_keep(raw: &str, origin: &str) -> String {
    match to_iso8601(raw) {
        Some(iso) => iso,
        None => {
            log::warn!(
                "[PARSE] Couldn't parse time {:?} in {}, keeping original",
                raw,
                origin
            );
            raw.trim().to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Start,
    End,
}

/// Parses a date filter. Accepts RFC 3339, `YYYY-MM-DD` and the legacy
/// `MM-DD-YYYY`. A date-only end bound covers that whole day.
pub fn parse_date_bound(value: &str, side: BoundSide) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Some(t) = parse_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m-%d-%Y"))
        .map_err(|_| {
            format!(
                "invalid date {:?} (use YYYY-MM-DD, MM-DD-YYYY or RFC 3339)",
                value
            )
        })?;
    let naive = match side {
        BoundSide::Start => date.and_hms_opt(0, 0, 0),
        BoundSide::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    }
    .ok_or_else(|| format!("invalid date {:?}", value))?;
    Ok(naive.and_utc())
}

/// Inclusive on both bounds; a missing bound is unbounded.
pub fn in_range(t: DateTime<Utc>, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    if let Some(start) = start {
        if t < start {
            return false;
        }
    }
    if let Some(end) = end {
        if t > end {
            return false;
        }
    }
    true
}

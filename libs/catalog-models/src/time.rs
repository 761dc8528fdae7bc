//! Catalog timestamp handling
//!
//! The catalog stores every timestamp twice: a compact display string
//! (`yyyyMMddHHmmss`) on the public field, and a real date value on a
//! private sibling field that range queries and indexes use. This module
//! owns the display format; the storage layer derives the date value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Display format used by `creationDate`, `modificationDate` and friends.
pub const DISPLAY_FORMAT: &str = "%Y%m%d%H%M%S";

/// Current time rendered in the display format.
pub fn now_display() -> String {
    Utc::now().format(DISPLAY_FORMAT).to_string()
}

/// Current time as a UTC instant.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a display-format timestamp.
///
/// Accepts full second precision (`20240301101500`), minute precision
/// (`202403011015`) and date-only (`20240301`, midnight). Returns `None`
/// for anything else; callers decide whether that is an error.
pub fn parse_display(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Whether a display value carries only date precision (no time of day).
pub fn is_date_only(value: &str) -> bool {
    value.len() == 8
}

/// Render an instant in the display format.
pub fn to_display(instant: DateTime<Utc>) -> String {
    instant.format(DISPLAY_FORMAT).to_string()
}

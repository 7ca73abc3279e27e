//! Timestamp helpers for the order table and the fetch filter.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::fmt::Display;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Render a purchase date in local time. Empty stays empty; anything that is
/// not RFC 3339 is shown verbatim.
pub fn format_iso(iso: &str) -> String {
    format_iso_in(iso, &Local)
}

pub fn format_iso_in<Tz>(iso: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let trimmed = iso.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(dt) => dt.with_timezone(tz).format(DISPLAY_FORMAT).to_string(),
        Err(_) => iso.to_string(),
    }
}

/// Normalize the `last_updated_after` filter to UTC `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` as produced by a
/// datetime-local control, which is read as local time.
pub fn normalize_last_updated_after(input: &str) -> Option<String> {
    normalize_last_updated_after_in(input, &Local)
}

pub fn normalize_last_updated_after_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(to_utc_string(&dt.with_timezone(&Utc)));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| to_utc_string(&dt.with_timezone(&Utc)))
}

fn to_utc_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Timestamp fragment for export file names: `:` and `.` become `-`.
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn format_iso_renders_in_given_zone() {
        assert_eq!(
            format_iso_in("2025-01-01T00:00:00Z", &Utc),
            "2025-01-01 00:00:00"
        );
        let athens = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            format_iso_in("2025-01-01T00:00:00Z", &athens),
            "2025-01-01 02:00:00"
        );
    }

    #[test]
    fn format_iso_keeps_unparseable_input() {
        assert_eq!(format_iso_in("", &Utc), "");
        assert_eq!(format_iso_in("yesterday", &Utc), "yesterday");
    }

    #[test]
    fn last_updated_after_accepts_rfc3339() {
        assert_eq!(
            normalize_last_updated_after_in("2025-08-07T02:00:00+02:00", &Utc).as_deref(),
            Some("2025-08-07T00:00:00Z")
        );
    }

    #[test]
    fn last_updated_after_reads_naive_as_local() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            normalize_last_updated_after_in("2025-08-07T02:00", &plus_two).as_deref(),
            Some("2025-08-07T00:00:00Z")
        );
    }

    #[test]
    fn last_updated_after_drops_garbage() {
        assert_eq!(normalize_last_updated_after_in("  ", &Utc), None);
        assert_eq!(normalize_last_updated_after_in("soon", &Utc), None);
    }

    #[test]
    fn file_stamp_has_no_colons_or_dots() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(file_stamp(now), "2025-01-02T03-04-05-000Z");
    }
}

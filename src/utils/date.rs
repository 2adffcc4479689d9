//! Date parsing for content metadata and file names.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Formats accepted for `date` / `modified` metadata, tried in order.
const FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a metadata date.
///
/// Accepts RFC 3339, `YYYY-MM-DD`, and `YYYY-MM-DD[ T]HH:MM[:SS]`.
/// Offsets are converted to local time.
pub fn parse(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Some(dt) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Split a `YYYY-MM-DD-` prefix off a file or directory name.
///
/// `2024-01-01-hello` → `(Some(2024-01-01 00:00), "hello")`.
pub fn split_prefix(name: &str) -> (Option<NaiveDateTime>, &str) {
    let bytes = name.as_bytes();
    if bytes.len() > 11 && bytes[10] == b'-' && name.is_char_boundary(10) {
        if let Some(date) = parse(&name[..10]) {
            return (Some(date), &name[11..]);
        }
    }
    (None, name)
}

/// Current local time.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_date_only() {
        let dt = parse("2024-02-29").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2024, 2, 29, 0));
    }

    #[test]
    fn test_parse_with_time() {
        let dt = parse("2024-01-02 03:04").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (3, 4, 0));

        let dt = parse("2024-01-02T03:04:05").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (3, 4, 5));
    }

    #[test]
    fn test_parse_rfc3339() {
        assert!(parse("2024-01-02T03:04:05Z").is_some());
        assert!(parse("2024-01-02T03:04:05+08:00").is_some());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse("2023-02-29").is_none());
        assert!(parse("yesterday").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn test_split_prefix() {
        let (date, rest) = split_prefix("2024-01-01-hello");
        assert_eq!(date.map(|d| d.year()), Some(2024));
        assert_eq!(rest, "hello");

        assert_eq!(split_prefix("hello").1, "hello");
        assert_eq!(split_prefix("2024-13-01-bad").1, "2024-13-01-bad");
        assert_eq!(split_prefix("2024-01-01").1, "2024-01-01");
    }
}

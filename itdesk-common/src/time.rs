//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 UTC strings with millisecond precision
//! (`2024-01-15T10:30:00.123Z`), so lexical order equals chronological order.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp in the storage format
pub fn to_db_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the storage format
pub fn now_string() -> String {
    to_db_string(now())
}

/// Storage-format timestamp `days` days before now
pub fn days_ago_string(days: i64) -> String {
    to_db_string(now() - Duration::days(days))
}

/// Storage-format timestamp `hours` hours after now
pub fn hours_from_now_string(hours: i64) -> String {
    to_db_string(now() + Duration::hours(hours))
}

/// Parse a calendar date in `YYYY-MM-DD` form
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_has_millis_and_z() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T07:08:09.5+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(to_db_string(ts), "2024-03-05T07:08:09.500Z");
    }

    #[test]
    fn test_db_strings_sort_chronologically() {
        let earlier = days_ago_string(3);
        let later = now_string();
        assert!(earlier < later);
        assert!(later < hours_from_now_string(1));
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2024-02-29").is_some());
        assert!(parse_date("2023-02-29").is_none());
        assert!(parse_date("15/01/2024").is_none());
    }
}

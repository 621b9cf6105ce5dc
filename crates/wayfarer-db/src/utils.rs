//! Shared utility functions

use chrono::{DateTime, Utc};

/// Parse a datetime string (RFC 3339 format), returning `None` on failure.
///
/// Used for nullable timestamp columns where a missing or unparseable value
/// must stay absent rather than default to the current time.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse a datetime string (RFC 3339 format) or return current time
///
/// Used for the non-null bookkeeping columns (`created_at`, `updated_at`)
/// where a fallback beats failing the whole row.
pub fn parse_datetime_or_now(s: &str) -> DateTime<Utc> {
    parse_datetime(s).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        let parsed = parse_datetime("2024-01-01T12:00:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");
        assert!(parse_datetime("not-a-date").is_none());
    }

    #[test]
    fn test_parse_datetime_or_now() {
        let valid_time = "2024-01-01T12:00:00Z";
        let parsed = parse_datetime_or_now(valid_time);
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T12:00:00+00:00");

        // Invalid time should return current time (just check it doesn't panic)
        let now_before = Utc::now();
        let parsed = parse_datetime_or_now("invalid");
        let now_after = Utc::now();
        assert!(parsed >= now_before && parsed <= now_after);
    }
}

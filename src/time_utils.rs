// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timestamp helpers for backend payloads.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp in any offset and normalize it to UTC.
pub fn parse_utc_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_kst() {
        let parsed = parse_utc_rfc3339("2026-05-01T08:30:00+09:00").unwrap();
        assert_eq!(format_utc_rfc3339(parsed), "2026-04-30T23:30:00Z");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_utc_rfc3339("yesterday").is_none());
    }
}

//! Shared timestamp helpers for state files and evidence envelopes.

use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the current instant as RFC3339 UTC (e.g. `2026-08-23T10:15:04Z`).
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC3339 timestamp into a UTC instant.
pub fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True when `ts` is within `max_age_hours` of now. Unparseable or
/// future-dated timestamps are treated as stale, never as fresh.
pub fn is_fresh(ts: &str, max_age_hours: i64) -> bool {
    let Some(then) = parse_rfc3339(ts) else {
        return false;
    };
    let age = Utc::now().signed_duration_since(then);
    age >= chrono::Duration::zero() && age < chrono::Duration::hours(max_age_hours)
}

/// Human-readable age of an RFC3339 timestamp, for gate messages.
pub fn age_of(ts: &str) -> String {
    match parse_rfc3339(ts) {
        Some(then) => {
            let mins = Utc::now().signed_duration_since(then).num_minutes();
            if mins < 60 {
                format!("{}m", mins.max(0))
            } else {
                format!("{}h", mins / 60)
            }
        }
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_rfc3339_roundtrips() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'));
        assert!(parse_rfc3339(&ts).is_some());
    }

    #[test]
    fn test_is_fresh_recent() {
        assert!(is_fresh(&now_rfc3339(), 24));
    }

    #[test]
    fn test_is_fresh_stale() {
        let old =
            (Utc::now() - chrono::Duration::hours(25)).to_rfc3339_opts(SecondsFormat::Secs, true);
        assert!(!is_fresh(&old, 24));
    }

    #[test]
    fn test_is_fresh_rejects_garbage_and_future() {
        assert!(!is_fresh("not-a-timestamp", 24));
        let future =
            (Utc::now() + chrono::Duration::hours(2)).to_rfc3339_opts(SecondsFormat::Secs, true);
        assert!(!is_fresh(&future, 24));
    }

    #[test]
    fn test_age_of_formats() {
        let old =
            (Utc::now() - chrono::Duration::hours(3)).to_rfc3339_opts(SecondsFormat::Secs, true);
        assert_eq!(age_of(&old), "3h");
        assert_eq!(age_of("garbage"), "unknown");
    }
}

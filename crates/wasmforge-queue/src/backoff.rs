//! Pure backoff/retention-window calculations, kept separate from the
//! async claim loop so they're unit-testable without a database (spec §8:
//! "tests target the pure backoff/retention-window calculations").

use chrono::{DateTime, Duration, Utc};

const BACKOFF_BASE_SECS: i64 = 2;
const COMPLETED_RETENTION_HOURS: i64 = 24;
const COMPLETED_RETENTION_CAP: i64 = 1000;
const FAILED_RETENTION_DAYS: i64 = 7;
const DEFAULT_LEASE_SECS: i64 = 300;

/// Exponential backoff with base 2s: `2s * 2^attempt` (spec §4.1).
pub fn next_backoff(attempt: i32) -> Duration {
    let secs = BACKOFF_BASE_SECS * 2i64.pow(attempt.max(0) as u32);
    Duration::seconds(secs)
}

/// Whether a completed/failed row has aged out of retention.
pub fn is_expired(completed_at: DateTime<Utc>, now: DateTime<Utc>, failed: bool) -> bool {
    let age = now.signed_duration_since(completed_at);
    if failed {
        age >= Duration::days(FAILED_RETENTION_DAYS)
    } else {
        age >= Duration::hours(COMPLETED_RETENTION_HOURS)
    }
}

/// Row-count cap applied to completed jobs regardless of age (spec §4.1:
/// "completed jobs retained 24h (cap 1000)").
pub fn completed_retention_cap() -> i64 {
    COMPLETED_RETENTION_CAP
}

/// Whether a claimed-but-unacked row has outlived its lease and should be
/// reclaimed by another consumer (spec §4.1's at-least-once mechanism).
pub fn lease_expired(claimed_at: DateTime<Utc>, now: DateTime<Utc>, lease_secs: i64) -> bool {
    now.signed_duration_since(claimed_at) >= Duration::seconds(lease_secs)
}

pub fn default_lease_secs() -> i64 {
    DEFAULT_LEASE_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_attempt() {
        assert_eq!(next_backoff(0), Duration::seconds(2));
        assert_eq!(next_backoff(1), Duration::seconds(4));
        assert_eq!(next_backoff(2), Duration::seconds(8));
    }

    #[test]
    fn completed_rows_expire_after_24h() {
        let now = Utc::now();
        let just_under = now - Duration::hours(23);
        let just_over = now - Duration::hours(25);
        assert!(!is_expired(just_under, now, false));
        assert!(is_expired(just_over, now, false));
    }

    #[test]
    fn failed_rows_expire_after_7d() {
        let now = Utc::now();
        let just_under = now - Duration::days(6);
        let just_over = now - Duration::days(8);
        assert!(!is_expired(just_under, now, true));
        assert!(is_expired(just_over, now, true));
    }

    #[test]
    fn lease_expires_after_configured_window() {
        let now = Utc::now();
        let claimed_at = now - Duration::seconds(301);
        assert!(lease_expired(claimed_at, now, 300));
        assert!(!lease_expired(now, now, 300));
    }
}

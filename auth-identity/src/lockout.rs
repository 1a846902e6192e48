//! Brute-force lockout policy
//!
//! Pure functions over the stored counters; nothing here touches the
//! store. The remaining-minutes figure is derived on every read, never
//! persisted.

use chrono::{DateTime, Duration, Utc};

use crate::config::AuthConfig;

/// An account is locked iff a lock timestamp is set and still in the future
pub fn is_locked(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(locked_until, Some(until) if until > now)
}

/// Remaining lock time in whole minutes, rounded up
///
/// A lock with 29m59s left still reports 30 so the user is never told a
/// smaller wait than the real one.
pub fn remaining_minutes(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (locked_until - now).num_seconds().max(0);
    (seconds + 59) / 60
}

/// Expiry for a lock applied at `now`
pub fn lock_expiry(now: DateTime<Utc>, config: &AuthConfig) -> DateTime<Utc> {
    now + Duration::minutes(config.lockout_minutes)
}

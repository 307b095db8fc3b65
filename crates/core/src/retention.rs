//! Age-based retention for local snapshot copies.

use chrono::{DateTime, Duration, Utc};

use crate::snapshot::LocalSnapshotCopy;

/// Default retention window for local copies (days).
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Whether a copy created at `created_at` is past `retention` at `now`.
///
/// Strict comparison: a copy exactly `retention` old is kept.
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, retention: Duration) -> bool {
    now - created_at > retention
}

/// Copies eligible for deletion. Copies without a timestamp are still being
/// created and are never returned.
pub fn expired_copies(
    copies: &[LocalSnapshotCopy],
    now: DateTime<Utc>,
    retention: Duration,
) -> Vec<&LocalSnapshotCopy> {
    copies
        .iter()
        .filter(|c| matches!(c.created_at, Some(t) if is_expired(t, now, retention)))
        .collect()
}

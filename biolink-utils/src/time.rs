use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Warnings decay after this long without a new violation.
pub const DEFAULT_WARNING_EXPIRY: Duration = Duration::from_secs(12 * 60 * 60);

/// Return the current unix timestamp in seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Whether a record last touched at `last_at` has decayed by `now`.
///
/// The window is exclusive: a record exactly `window_secs` old is still live.
/// Timestamps from the future (clock skew between writers) never count as expired.
pub fn is_expired(last_at: u64, now: u64, window_secs: u64) -> bool {
    now.saturating_sub(last_at) > window_secs
}

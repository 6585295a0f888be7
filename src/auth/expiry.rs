// Expiry evaluation
// Pure expiry arithmetic; epoch seconds end to end

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock as epoch seconds.
///
/// The only SystemTime conversion point in the crate; everything else
/// works in epoch seconds.
pub fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Whether a credential expiring at `expires_at` is unusable at `now`,
/// given a safety buffer in minutes.
///
/// A buffer longer than the token's remaining lifetime classifies it as
/// expired permanently; renewal is always preferred over using a
/// soon-dead credential.
pub fn is_expired_at(now: u64, expires_at: u64, buffer_minutes: u64) -> bool {
    now.saturating_add(buffer_minutes * 60) >= expires_at
}

/// Wall-clock wrapper over [`is_expired_at`].
pub fn is_expired(expires_at: u64, buffer_minutes: u64) -> bool {
    is_expired_at(epoch_seconds(), expires_at, buffer_minutes)
}

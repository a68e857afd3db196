//! Lease renewal arithmetic and state transitions.

use crate::types::RegistrationState;

/// Result of one backoff step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffResult {
    /// How long to sleep before the next attempt.
    pub sleep_ms: u64,
    /// Base delay for the attempt after that.
    pub next_backoff_ms: u64,
}

/// Exponential backoff with additive jitter.
///
/// Sleeps `current_backoff_ms` plus up to half of it again (taken from
/// `jitter_seed`), then doubles the base, capped at `max_backoff_ms`.
///
/// ```ignore
/// let step = compute_backoff_with_jitter(100, 1_000, 0);
/// assert_eq!(step.sleep_ms, 100);
/// assert_eq!(step.next_backoff_ms, 200);
/// ```
#[inline]
pub fn compute_backoff_with_jitter(current_backoff_ms: u64, max_backoff_ms: u64, jitter_seed: u64) -> BackoffResult {
    let base = current_backoff_ms.min(max_backoff_ms);
    let jitter_range = base / 2;
    let jitter = if jitter_range == 0 {
        0
    } else {
        jitter_seed % jitter_range.saturating_add(1)
    };
    BackoffResult {
        sleep_ms: base.saturating_add(jitter).min(max_backoff_ms.max(base)),
        next_backoff_ms: base.saturating_mul(2).min(max_backoff_ms),
    }
}

/// Renewal period actually used for a lease.
///
/// Falls back to half the TTL when the configured interval could not keep
/// the lease alive, and never returns zero.
#[inline]
pub fn effective_renew_interval_ms(ttl_ms: u64, renew_interval_ms: u64) -> u64 {
    let interval = if renew_interval_ms == 0 || renew_interval_ms >= ttl_ms {
        ttl_ms / 2
    } else {
        renew_interval_ms
    };
    interval.max(1)
}

/// Decide whether a failing renewal round should stop retrying.
///
/// # Arguments
///
/// * `attempts_made` - Attempts already made in this round
/// * `max_attempts` - Hard cap on attempts in one round
/// * `remaining_lease_ms` - Time until the lease lapses by the client's own reckoning
/// * `next_sleep_ms` - Delay before the next attempt would be sent
///
/// The deadline is the normal stop condition: a retry sent after it would be
/// refused since the backend has already dropped the record.
#[inline]
pub fn should_abandon_renewal(
    attempts_made: u32,
    max_attempts: u32,
    remaining_lease_ms: u64,
    next_sleep_ms: u64,
) -> bool {
    attempts_made >= max_attempts || next_sleep_ms >= remaining_lease_ms
}

/// Whether a registration may move from `from` to `to`.
///
/// `Unregistered` is reachable from every state except itself, including
/// `Expired` so that an owner can still clean up after losing a lease.
pub fn is_valid_transition(from: RegistrationState, to: RegistrationState) -> bool {
    use RegistrationState::*;
    matches!(
        (from, to),
        (Pending, Active)
            | (Pending, Waiting)
            | (Pending, Unregistered)
            | (Active, Expired)
            | (Active, Unregistered)
            | (Waiting, Elected)
            | (Waiting, Expired)
            | (Waiting, Unregistered)
            | (Elected, Expired)
            | (Elected, Unregistered)
            | (Expired, Unregistered)
    )
}

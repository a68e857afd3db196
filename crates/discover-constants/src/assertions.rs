//! Compile-time constant assertions.
//!
//! Each assertion pins a relationship between constants that the lease and
//! election loops rely on.

use super::election::*;
use super::lease::*;
use super::registry::*;

// ============================================================================
// Lease Timing
// ============================================================================
// Renewal must happen strictly inside the lease window, leaving room for
// at least one retry round before the lease lapses.

const _: () = assert!(DEFAULT_RENEW_INTERVAL_MS < DEFAULT_LEASE_TTL_MS);
const _: () = assert!(DEFAULT_RENEW_INTERVAL_MS > 0);
const _: () = assert!(MIN_LEASE_TTL_MS <= DEFAULT_LEASE_TTL_MS);
const _: () = assert!(DEFAULT_LEASE_TTL_MS <= MAX_LEASE_TTL_MS);
const _: () = assert!(DEFAULT_CALL_TIMEOUT_MS < DEFAULT_LEASE_TTL_MS - DEFAULT_RENEW_INTERVAL_MS);

// Backoff progression
const _: () = assert!(DEFAULT_RENEW_INITIAL_BACKOFF_MS > 0);
const _: () = assert!(DEFAULT_RENEW_INITIAL_BACKOFF_MS <= DEFAULT_RENEW_MAX_BACKOFF_MS);

// Retry budgets
const _: () = assert!(DEFAULT_RENEW_MAX_ATTEMPTS > 0);
const _: () = assert!(DEFAULT_REGISTER_MAX_ATTEMPTS > 0);
const _: () = assert!(DEFAULT_DELETE_MAX_ATTEMPTS > 0);
const _: () = assert!(DEFAULT_RENEW_MAX_ATTEMPTS <= MAX_RETRY_ATTEMPTS);
// The renewal cap must not end a round before the lease window does.
const _: () = assert!(
    DEFAULT_RENEW_MAX_ATTEMPTS as u64 * DEFAULT_RENEW_MAX_BACKOFF_MS >= DEFAULT_LEASE_TTL_MS - DEFAULT_RENEW_INTERVAL_MS
);
const _: () = assert!(DEFAULT_REGISTER_MAX_ATTEMPTS <= MAX_RETRY_ATTEMPTS);
const _: () = assert!(DEFAULT_DELETE_MAX_ATTEMPTS <= MAX_RETRY_ATTEMPTS);

// ============================================================================
// Election
// ============================================================================
// A standby must notice a vanished competitor well within one lease window.

const _: () = assert!(MIN_ELECTION_POLL_INTERVAL_MS <= DEFAULT_ELECTION_POLL_INTERVAL_MS);
const _: () = assert!(DEFAULT_ELECTION_POLL_INTERVAL_MS < DEFAULT_RENEW_INTERVAL_MS);

// ============================================================================
// Registry Bounds
// ============================================================================

const _: () = assert!(MAX_SERVICE_NAME_SIZE > 0);
const _: () = assert!(MAX_IP_SIZE > 0);
const _: () = assert!(MAX_ATTRIBUTE_KEY_SIZE <= MAX_ATTRIBUTE_VALUE_SIZE);
const _: () = assert!(MAX_FILTER_KEYS <= MAX_ATTRIBUTES);
const _: () = assert!(MAX_REGISTRATIONS_PER_SERVICE > 0);

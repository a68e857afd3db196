//! Lease lifetime and renewal budgets.

/// Default lease TTL (10 seconds).
///
/// A registration that is not renewed within this window is treated as
/// expired by the backend and disappears from discovery.
pub const DEFAULT_LEASE_TTL_MS: u64 = 10_000;

/// Default renewal interval (TTL / 2).
pub const DEFAULT_RENEW_INTERVAL_MS: u64 = DEFAULT_LEASE_TTL_MS / 2;

/// Smallest TTL accepted by configuration validation.
pub const MIN_LEASE_TTL_MS: u64 = 100;

/// Largest TTL accepted by configuration validation (1 hour).
pub const MAX_LEASE_TTL_MS: u64 = 3_600_000;

/// Hard cap on renewal attempts in one round.
///
/// A failing round normally ends when the next retry would land past the
/// lease deadline. The cap only bounds rounds against a misbehaving clock.
pub const DEFAULT_RENEW_MAX_ATTEMPTS: u32 = 16;

/// First backoff step after a failed renewal.
pub const DEFAULT_RENEW_INITIAL_BACKOFF_MS: u64 = 50;

/// Ceiling for renewal backoff.
pub const DEFAULT_RENEW_MAX_BACKOFF_MS: u64 = 1_000;

/// Attempts for the initial create before `register` fails.
pub const DEFAULT_REGISTER_MAX_ATTEMPTS: u32 = 3;

/// Attempts for an explicit delete, inline attempt included.
pub const DEFAULT_DELETE_MAX_ATTEMPTS: u32 = 5;

/// Upper bound on a single backend round trip.
///
/// Keeps one slow call from stalling a renewal loop past its lease.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 2_000;

/// Hard cap on any retry budget, regardless of configuration.
pub const MAX_RETRY_ATTEMPTS: u32 = 32;

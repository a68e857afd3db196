//! Standby election cadence.

/// How often a waiting standby re-counts its competitors when no change
/// notification arrives.
pub const DEFAULT_ELECTION_POLL_INTERVAL_MS: u64 = 100;

/// Smallest poll interval accepted by configuration validation.
pub const MIN_ELECTION_POLL_INTERVAL_MS: u64 = 10;

//! Tunables for leases, discovery and election.
//!
//! Every struct deserializes with per-field defaults so a partial TOML table
//! only overrides what it names.

use discover_constants::election::DEFAULT_ELECTION_POLL_INTERVAL_MS;
use discover_constants::election::MIN_ELECTION_POLL_INTERVAL_MS;
use discover_constants::lease::DEFAULT_CALL_TIMEOUT_MS;
use discover_constants::lease::DEFAULT_DELETE_MAX_ATTEMPTS;
use discover_constants::lease::DEFAULT_LEASE_TTL_MS;
use discover_constants::lease::DEFAULT_REGISTER_MAX_ATTEMPTS;
use discover_constants::lease::DEFAULT_RENEW_INITIAL_BACKOFF_MS;
use discover_constants::lease::DEFAULT_RENEW_INTERVAL_MS;
use discover_constants::lease::DEFAULT_RENEW_MAX_ATTEMPTS;
use discover_constants::lease::DEFAULT_RENEW_MAX_BACKOFF_MS;
use discover_constants::lease::MAX_LEASE_TTL_MS;
use discover_constants::lease::MAX_RETRY_ATTEMPTS;
use discover_constants::lease::MIN_LEASE_TTL_MS;
use serde::Deserialize;
use serde::Serialize;

use crate::error::DiscoverError;

/// Lease and backend-call settings shared by every registration of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Lease time-to-live granted on every put.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Time between successful renewals. Must be below `ttl_ms`.
    #[serde(default = "default_renew_interval_ms")]
    pub renew_interval_ms: u64,

    /// Hard cap on renewal attempts in one round. A failing round normally
    /// ends earlier, when the next retry would land past the lease deadline.
    #[serde(default = "default_renew_max_attempts")]
    pub renew_max_attempts: u32,

    /// First retry delay after a failed renewal.
    #[serde(default = "default_renew_initial_backoff_ms")]
    pub renew_initial_backoff_ms: u64,

    /// Upper bound on the retry delay.
    #[serde(default = "default_renew_max_backoff_ms")]
    pub renew_max_backoff_ms: u64,

    /// Attempts for the initial put of a registration or an update.
    #[serde(default = "default_register_max_attempts")]
    pub register_max_attempts: u32,

    /// Total attempts for deleting a registration on unregister.
    #[serde(default = "default_delete_max_attempts")]
    pub delete_max_attempts: u32,

    /// Deadline for a single backend call. Must be shorter than the slack
    /// between a renewal and the lease deadline (`ttl_ms - renew_interval_ms`).
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            renew_interval_ms: default_renew_interval_ms(),
            renew_max_attempts: default_renew_max_attempts(),
            renew_initial_backoff_ms: default_renew_initial_backoff_ms(),
            renew_max_backoff_ms: default_renew_max_backoff_ms(),
            register_max_attempts: default_register_max_attempts(),
            delete_max_attempts: default_delete_max_attempts(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl LeaseConfig {
    /// Check that the values can work together.
    pub fn validate(&self) -> Result<(), DiscoverError> {
        if !(MIN_LEASE_TTL_MS..=MAX_LEASE_TTL_MS).contains(&self.ttl_ms) {
            return Err(invalid(format!(
                "ttl_ms {} outside [{MIN_LEASE_TTL_MS}, {MAX_LEASE_TTL_MS}]",
                self.ttl_ms
            )));
        }
        if self.renew_interval_ms == 0 || self.renew_interval_ms >= self.ttl_ms {
            return Err(invalid(format!(
                "renew_interval_ms {} must be non-zero and below ttl_ms {}",
                self.renew_interval_ms, self.ttl_ms
            )));
        }
        for (name, attempts) in [
            ("renew_max_attempts", self.renew_max_attempts),
            ("register_max_attempts", self.register_max_attempts),
            ("delete_max_attempts", self.delete_max_attempts),
        ] {
            if attempts == 0 || attempts > MAX_RETRY_ATTEMPTS {
                return Err(invalid(format!("{name} {attempts} outside [1, {MAX_RETRY_ATTEMPTS}]")));
            }
        }
        if self.renew_initial_backoff_ms == 0 || self.renew_initial_backoff_ms > self.renew_max_backoff_ms {
            return Err(invalid(format!(
                "renew_initial_backoff_ms {} must be non-zero and at most renew_max_backoff_ms {}",
                self.renew_initial_backoff_ms, self.renew_max_backoff_ms
            )));
        }
        if self.call_timeout_ms == 0 {
            return Err(invalid("call_timeout_ms must be non-zero".to_string()));
        }
        // A renew that hangs for the full timeout must still answer before the lease lapses.
        let slack_ms = self.ttl_ms - self.renew_interval_ms;
        if self.call_timeout_ms >= slack_ms {
            return Err(invalid(format!(
                "call_timeout_ms {} must be below ttl_ms - renew_interval_ms ({slack_ms})",
                self.call_timeout_ms
            )));
        }
        Ok(())
    }
}

/// Settings for discovery lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Attempts for one `list` before the lookup fails.
    #[serde(default = "default_list_max_attempts")]
    pub list_max_attempts: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            list_max_attempts: default_list_max_attempts(),
        }
    }
}

impl DirectoryConfig {
    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), DiscoverError> {
        if self.list_max_attempts == 0 || self.list_max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(invalid(format!(
                "list_max_attempts {} outside [1, {MAX_RETRY_ATTEMPTS}]",
                self.list_max_attempts
            )));
        }
        Ok(())
    }
}

/// Settings for standby election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Re-evaluation period when the backend sends no change notification.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ElectionConfig {
    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), DiscoverError> {
        if self.poll_interval_ms < MIN_ELECTION_POLL_INTERVAL_MS {
            return Err(invalid(format!(
                "poll_interval_ms {} below minimum {MIN_ELECTION_POLL_INTERVAL_MS}",
                self.poll_interval_ms
            )));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> DiscoverError {
    DiscoverError::InvalidConfig { reason }
}

fn default_ttl_ms() -> u64 {
    DEFAULT_LEASE_TTL_MS
}

fn default_renew_interval_ms() -> u64 {
    DEFAULT_RENEW_INTERVAL_MS
}

fn default_renew_max_attempts() -> u32 {
    DEFAULT_RENEW_MAX_ATTEMPTS
}

fn default_renew_initial_backoff_ms() -> u64 {
    DEFAULT_RENEW_INITIAL_BACKOFF_MS
}

fn default_renew_max_backoff_ms() -> u64 {
    DEFAULT_RENEW_MAX_BACKOFF_MS
}

fn default_register_max_attempts() -> u32 {
    DEFAULT_REGISTER_MAX_ATTEMPTS
}

fn default_delete_max_attempts() -> u32 {
    DEFAULT_DELETE_MAX_ATTEMPTS
}

fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

fn default_list_max_attempts() -> u32 {
    DEFAULT_REGISTER_MAX_ATTEMPTS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_ELECTION_POLL_INTERVAL_MS
}

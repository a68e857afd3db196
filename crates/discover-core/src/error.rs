use thiserror::Error;

use crate::types::ServiceIdentity;

/// Errors surfaced by a registry backend.
///
/// Transport failures and lease loss are kept apart because the client
/// reacts to them differently: the former are retried, the latter end the
/// registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached or refused to serve the request.
    #[error("registry backend unavailable: {reason}")]
    Unavailable {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The lease is unknown, superseded, or has already lapsed.
    #[error("lease lost for {identity}")]
    LeaseLost {
        /// Identity whose lease was lost.
        identity: ServiceIdentity,
    },

    /// The request carried an identity or attributes outside the fixed bounds.
    #[error("invalid registration: {reason}")]
    InvalidRegistration {
        /// Which bound was violated.
        reason: String,
    },

    /// The service already holds the maximum number of registrations.
    #[error("service '{service_name}' is full: {count} registrations (max: {max})")]
    ServiceFull {
        /// Service name.
        service_name: String,
        /// Current registration count.
        count: u32,
        /// Maximum allowed.
        max: u32,
    },
}

impl BackendError {
    /// True for failures worth retrying against the same backend.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Unavailable { .. })
    }
}

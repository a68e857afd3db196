//! Error types for the registry client.

use discover_core::BackendError;
use discover_core::ServiceIdentity;
use snafu::Snafu;

/// Errors surfaced synchronously by client operations.
///
/// Background failures (a renewal loop giving up) are never returned through
/// this type on an unrelated call; they show up as a state transition on the
/// affected handle instead.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DiscoverError {
    /// The backend could not be reached within the retry budget.
    #[snafu(display("registry backend unavailable for {operation} after {attempts} attempts: {source}"))]
    BackendUnavailable {
        /// Operation that was being attempted.
        operation: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last backend error seen.
        source: BackendError,
    },

    /// The lease backing a registration is gone.
    #[snafu(display("lease lost for {identity}"))]
    LeaseLost {
        /// Identity whose lease was lost.
        identity: ServiceIdentity,
    },

    /// A discovery filter violated the filter bounds.
    #[snafu(display("invalid filter: {reason}"))]
    InvalidFilter {
        /// Which bound was violated.
        reason: String,
    },

    /// A lookup named a service that can never exist.
    #[snafu(display("invalid service name {name:?}: {reason}"))]
    InvalidServiceName {
        /// Name as given.
        name: String,
        /// Which bound was violated.
        reason: String,
    },

    /// A registration request violated the identity or attribute bounds,
    /// or conflicted with an existing registration of another mode.
    #[snafu(display("invalid registration: {reason}"))]
    InvalidRegistration {
        /// Which rule was violated.
        reason: String,
    },

    /// The registration was unregistered while its first put was in flight.
    ///
    /// The record the put created is deleted again.
    #[snafu(display("{identity} was unregistered while its registration was in flight"))]
    UnregisteredInFlight {
        /// Identity that was being registered.
        identity: ServiceIdentity,
    },

    /// Configuration values that cannot work together.
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig {
        /// Description of the conflict.
        reason: String,
    },

    /// The backend refused the request for a non-transient reason.
    #[snafu(display("registry backend rejected {operation}: {source}"))]
    Rejected {
        /// Operation that was rejected.
        operation: String,
        /// Backend error.
        source: BackendError,
    },
}

impl DiscoverError {
    /// Map a non-retryable backend error for `operation`.
    pub(crate) fn from_backend(operation: &str, attempts: u32, source: BackendError) -> Self {
        match source {
            BackendError::Unavailable { .. } => DiscoverError::BackendUnavailable {
                operation: operation.to_string(),
                attempts,
                source,
            },
            BackendError::LeaseLost { identity } => DiscoverError::LeaseLost { identity },
            BackendError::InvalidRegistration { reason } => DiscoverError::InvalidRegistration { reason },
            BackendError::ServiceFull { .. } => DiscoverError::Rejected {
                operation: operation.to_string(),
                source,
            },
        }
    }

    /// True if the error came from the backend being unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DiscoverError::BackendUnavailable { .. })
    }
}

impl From<BackendError> for DiscoverError {
    fn from(source: BackendError) -> Self {
        DiscoverError::from_backend("backend call", 1, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_keeps_attempt_count() {
        let err = DiscoverError::from_backend("put", 3, BackendError::Unavailable {
            reason: "offline".to_string(),
        });
        assert!(err.is_unavailable());
        assert_eq!(
            err.to_string(),
            "registry backend unavailable for put after 3 attempts: registry backend unavailable: offline"
        );
    }

    #[test]
    fn lease_lost_maps_to_lease_lost() {
        let identity = ServiceIdentity::new("foo", "127.0.0.1", 1111);
        let err = DiscoverError::from_backend("renew", 1, BackendError::LeaseLost {
            identity: identity.clone(),
        });
        assert!(matches!(err, DiscoverError::LeaseLost { identity: i } if i == identity));
    }

    #[test]
    fn from_backend_error() {
        let err: DiscoverError = BackendError::InvalidRegistration {
            reason: "port must be non-zero".to_string(),
        }
        .into();
        assert!(matches!(err, DiscoverError::InvalidRegistration { .. }));
    }

    #[test]
    fn service_full_is_rejected() {
        let err = DiscoverError::from_backend("put", 1, BackendError::ServiceFull {
            service_name: "foo".to_string(),
            count: 1,
            max: 1,
        });
        assert!(matches!(err, DiscoverError::Rejected { .. }));
    }
}

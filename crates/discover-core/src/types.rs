//! Registration identity and record types shared by backend and client.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Attribute set attached to a registration.
///
/// Ordered so that equality, display and serialization are deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Unique key of a registration: `(service_name, ip, port)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Logical service name.
    pub service_name: String,
    /// IP or host the instance is reachable on.
    pub ip: String,
    /// Port the instance is reachable on.
    pub port: u16,
}

impl ServiceIdentity {
    /// Build an identity from its parts.
    pub fn new(service_name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            ip: ip.into(),
            port,
        }
    }

    /// Network address as `"<ip>:<port>"`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.service_name, self.ip, self.port)
    }
}

/// How a registration participates in discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationMode {
    /// Visible in discovery as soon as the backend acknowledges it.
    Active,
    /// Withheld from discovery until promoted by election.
    Standby,
}

impl RegistrationMode {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Standby => "standby",
        }
    }
}

/// Backend-side state of a registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordState {
    /// Ordinary registration holding a live lease.
    Active,
    /// Standby registration holding a live lease, not yet promoted.
    Waiting,
    /// Standby registration that won its election.
    Elected,
    /// Lease lapsed; the record is about to be purged.
    Expired,
}

impl RecordState {
    /// Whether a record in this state is projected into discovery snapshots.
    #[inline]
    pub fn is_visible(&self) -> bool {
        matches!(self, RecordState::Active | RecordState::Elected)
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Elected => "elected",
            Self::Expired => "expired",
        }
    }
}

/// One registration as reported by [`crate::RegistryBackend::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Unique key.
    pub identity: ServiceIdentity,
    /// Mode the registration was created with.
    pub mode: RegistrationMode,
    /// Current attributes (replaced wholesale on update).
    pub attributes: Attributes,
    /// Backend-side state.
    pub state: RecordState,
    /// Bumped on every in-place update, starts at 1.
    pub version: u64,
    /// Backend-assigned creation order; stable across updates.
    pub sequence: u64,
    /// Lease deadline in Unix milliseconds.
    pub lease_expiry_ms: u64,
}

impl RegistrationRecord {
    /// Whether this record shows up in discovery snapshots.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }
}

/// Proof of lease ownership, presented on renewal and promotion.
///
/// `lease_id` is fixed when the registration is first created and survives
/// in-place updates, so a re-registration does not invalidate the token held
/// by the renewal loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseToken {
    /// Registration the lease belongs to.
    pub identity: ServiceIdentity,
    /// Backend-assigned lease identifier.
    pub lease_id: u64,
}

/// Result of a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseGrant {
    /// Token for later renewals.
    pub token: LeaseToken,
    /// Lease deadline in Unix milliseconds.
    pub lease_expiry_ms: u64,
    /// Record version after the write.
    pub version: u64,
    /// Backend-assigned creation order.
    pub sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_ip_colon_port() {
        let identity = ServiceIdentity::new("foo", "127.0.0.1", 1111);
        assert_eq!(identity.address(), "127.0.0.1:1111");
    }

    #[test]
    fn identity_display() {
        let identity = ServiceIdentity::new("foo", "10.0.0.1", 80);
        assert_eq!(identity.to_string(), "foo@10.0.0.1:80");
    }

    #[test]
    fn only_active_and_elected_are_visible() {
        assert!(RecordState::Active.is_visible());
        assert!(RecordState::Elected.is_visible());
        assert!(!RecordState::Waiting.is_visible());
        assert!(!RecordState::Expired.is_visible());
    }
}

//! Client-side registration state.

use serde::Deserialize;
use serde::Serialize;

/// Lifecycle state of one registration as seen by the client holding it.
///
/// ```text
/// active:  Pending -> Active  -> Expired | Unregistered
/// standby: Pending -> Waiting -> Elected -> Unregistered
///                        \          \-> Expired
///                         \-> Expired | Unregistered
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationState {
    /// Submitted to the backend, not yet acknowledged.
    Pending,
    /// Acknowledged ordinary registration, visible in discovery.
    Active,
    /// Acknowledged standby, invisible, counting competitors.
    Waiting,
    /// Standby that won its election, visible in discovery.
    Elected,
    /// Lease lapsed, or renewal gave up before the lease deadline.
    Expired,
    /// Explicitly removed by its owner.
    Unregistered,
}

impl RegistrationState {
    /// No further transitions except an explicit unregister of an expired lease.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Unregistered)
    }

    /// Whether the registration contributes an instance to discovery.
    #[inline]
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Active | Self::Elected)
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Elected => "elected",
            Self::Expired => "expired",
            Self::Unregistered => "unregistered",
        }
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

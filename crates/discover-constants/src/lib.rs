//! Centralized constants for the discover service registry client.
//!
//! Constants are grouped by the component that consumes them:
//!
//! - [`registry`]: Input bounds for identities, attributes and filters
//! - [`lease`]: Lease TTL, renewal cadence and retry budgets
//! - [`election`]: Standby re-evaluation cadence
//!
//! Tiger Style: Constants are fixed and immutable, enforced at compile time.
//! Relationships between them are checked in a private `assertions` module.

mod assertions;
pub mod election;
pub mod lease;
pub mod registry;

/// Prelude module for commonly used constants.
pub mod prelude {
    pub use crate::election::DEFAULT_ELECTION_POLL_INTERVAL_MS;
    pub use crate::lease::DEFAULT_LEASE_TTL_MS;
    pub use crate::lease::DEFAULT_RENEW_INTERVAL_MS;
    pub use crate::registry::MAX_ATTRIBUTE_KEY_SIZE;
    pub use crate::registry::MAX_ATTRIBUTE_VALUE_SIZE;
    pub use crate::registry::MAX_ATTRIBUTES;
    pub use crate::registry::MAX_FILTER_KEYS;
    pub use crate::registry::MAX_SERVICE_NAME_SIZE;
}

//! Bounds on registration identities, attributes and discovery filters.
//!
//! Tiger Style: every user-supplied string and collection has a fixed upper
//! bound, checked before a request reaches the backend.

/// Maximum length of a service name in bytes.
pub const MAX_SERVICE_NAME_SIZE: u32 = 256;

/// Maximum length of an IP/host string in bytes.
///
/// Large enough for a bracketed IPv6 literal with zone id.
pub const MAX_IP_SIZE: u32 = 64;

/// Maximum number of attributes on one registration.
pub const MAX_ATTRIBUTES: u32 = 64;

/// Maximum length of an attribute key in bytes.
pub const MAX_ATTRIBUTE_KEY_SIZE: u32 = 128;

/// Maximum length of an attribute value in bytes.
pub const MAX_ATTRIBUTE_VALUE_SIZE: u32 = 1024;

/// Maximum number of keys in a discovery filter.
///
/// A filter can never usefully name more keys than a registration can carry.
pub const MAX_FILTER_KEYS: u32 = MAX_ATTRIBUTES;

/// Maximum number of registrations the in-memory backend keeps per service.
pub const MAX_REGISTRATIONS_PER_SERVICE: u32 = 10_000;

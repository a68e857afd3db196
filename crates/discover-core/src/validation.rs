//! Bounds checks for identities and attribute sets.
//!
//! Shared by the client (to reject bad input before any round trip) and by
//! the in-memory backend (which must not trust its callers either).

use discover_constants::registry::MAX_ATTRIBUTE_KEY_SIZE;
use discover_constants::registry::MAX_ATTRIBUTE_VALUE_SIZE;
use discover_constants::registry::MAX_ATTRIBUTES;
use discover_constants::registry::MAX_IP_SIZE;
use discover_constants::registry::MAX_SERVICE_NAME_SIZE;

use crate::BackendError;
use crate::types::Attributes;
use crate::types::ServiceIdentity;

/// Validate a service name on its own (used for lookups).
pub fn validate_service_name(service_name: &str) -> Result<(), String> {
    if service_name.is_empty() {
        return Err("service name is empty".to_string());
    }
    if service_name.len() > MAX_SERVICE_NAME_SIZE as usize {
        return Err(format!(
            "service name is {} bytes (max: {})",
            service_name.len(),
            MAX_SERVICE_NAME_SIZE
        ));
    }
    Ok(())
}

/// Validate every component of an identity.
pub fn validate_identity(identity: &ServiceIdentity) -> Result<(), String> {
    validate_service_name(&identity.service_name)?;
    if identity.ip.is_empty() {
        return Err("ip is empty".to_string());
    }
    if identity.ip.len() > MAX_IP_SIZE as usize {
        return Err(format!("ip is {} bytes (max: {})", identity.ip.len(), MAX_IP_SIZE));
    }
    if identity.port == 0 {
        return Err("port must be non-zero".to_string());
    }
    Ok(())
}

/// Validate an attribute map against count and size limits.
///
/// `max_entries` lets filters and registrations share the same check with
/// their own count limit.
pub fn validate_attribute_map(attributes: &Attributes, max_entries: u32) -> Result<(), String> {
    if attributes.len() > max_entries as usize {
        return Err(format!("{} attributes (max: {})", attributes.len(), max_entries));
    }
    for (key, value) in attributes {
        if key.is_empty() {
            return Err("attribute key is empty".to_string());
        }
        if key.len() > MAX_ATTRIBUTE_KEY_SIZE as usize {
            return Err(format!(
                "attribute key '{}' is {} bytes (max: {})",
                key,
                key.len(),
                MAX_ATTRIBUTE_KEY_SIZE
            ));
        }
        if value.len() > MAX_ATTRIBUTE_VALUE_SIZE as usize {
            return Err(format!(
                "value of attribute '{}' is {} bytes (max: {})",
                key,
                value.len(),
                MAX_ATTRIBUTE_VALUE_SIZE
            ));
        }
    }
    Ok(())
}

/// Validate a full registration request.
pub fn validate_registration(identity: &ServiceIdentity, attributes: &Attributes) -> Result<(), BackendError> {
    validate_identity(identity)
        .and_then(|()| validate_attribute_map(attributes, MAX_ATTRIBUTES))
        .map_err(|reason| BackendError::InvalidRegistration { reason })
}

//! Discovery: which instances of a service are online right now.
//!
//! Every lookup reads the backend directly, so a registration acknowledged
//! before the lookup started is always visible to it. Instances appear in
//! the order the backend created them.

use discover_constants::registry::MAX_FILTER_KEYS;
use discover_core::Attributes;
use discover_core::RegistrationRecord;
use discover_core::validation::validate_attribute_map;
use discover_core::validation::validate_service_name;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::backend_client::BackendClient;
use crate::config::DirectoryConfig;
use crate::error::DiscoverError;
use crate::pure::matches_filter;

/// Attribute constraints an instance must satisfy to be returned.
///
/// Every entry must be present on the instance with an equal value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFilter {
    attributes: Attributes,
}

impl ServiceFilter {
    /// Filter that matches every online instance.
    pub fn any() -> Self {
        Self::default()
    }

    /// Build a filter, rejecting empty keys and oversized entries.
    pub fn new(attributes: Attributes) -> Result<Self, DiscoverError> {
        validate_attribute_map(&attributes, MAX_FILTER_KEYS).map_err(|reason| DiscoverError::InvalidFilter { reason })?;
        Ok(Self { attributes })
    }

    /// Whether `attributes` satisfy this filter.
    #[inline]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        matches_filter(attributes, &self.attributes)
    }

    /// True if the filter has no constraints.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The constraints as an attribute map.
    pub fn as_attributes(&self) -> &Attributes {
        &self.attributes
    }
}

impl TryFrom<Attributes> for ServiceFilter {
    type Error = DiscoverError;

    fn try_from(attributes: Attributes) -> Result<Self, Self::Error> {
        Self::new(attributes)
    }
}

/// One online instance in a discovery snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    name: String,
    address: String,
    attributes: Attributes,
    version: u64,
}

impl Instance {
    fn from_record(record: RegistrationRecord) -> Self {
        Self {
            address: record.identity.address(),
            name: record.identity.service_name,
            attributes: record.attributes,
            version: record.version,
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"<ip>:<port>"`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Attributes at the time of the lookup.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Always true: snapshots only contain online instances.
    pub fn is_online(&self) -> bool {
        true
    }

    /// Backend record version at the time of the lookup.
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Snapshot of a service's online instances.
///
/// Not refreshed after it is returned; call
/// [`ServiceDirectory::service`] again for a newer view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    name: String,
    filter: ServiceFilter,
    online: Vec<Instance>,
}

impl Service {
    /// Service name that was looked up.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filter that was applied.
    pub fn filter(&self) -> &ServiceFilter {
        &self.filter
    }

    /// Matching online instances in creation order.
    pub fn online(&self) -> &[Instance] {
        &self.online
    }

    /// Number of matching online instances.
    pub fn len(&self) -> usize {
        self.online.len()
    }

    /// True if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }

    /// Iterate the matching instances.
    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.online.iter()
    }

    /// Addresses of the matching instances.
    pub fn addresses(&self) -> Vec<&str> {
        self.online.iter().map(Instance::address).collect()
    }
}

impl<'a> IntoIterator for &'a Service {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.online.iter()
    }
}

/// Read side of the registry.
#[derive(Debug, Clone)]
pub struct ServiceDirectory {
    client: BackendClient,
    config: DirectoryConfig,
}

impl ServiceDirectory {
    /// Directory reading through `client`.
    pub fn new(client: BackendClient, config: DirectoryConfig) -> Result<Self, DiscoverError> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// Online instances of `name` that satisfy `filter`.
    ///
    /// Waiting standbys and lapsed leases are excluded. An unknown name
    /// yields an empty snapshot.
    pub async fn service(&self, name: &str, filter: ServiceFilter) -> Result<Service, DiscoverError> {
        validate_service_name(name).map_err(|reason| DiscoverError::InvalidServiceName {
            name: name.to_string(),
            reason,
        })?;

        let records = self.client.list(name, self.config.list_max_attempts).await?;
        let total = records.len();
        let online: Vec<Instance> = records
            .into_iter()
            .filter(|record| record.is_visible() && filter.matches(&record.attributes))
            .map(Instance::from_record)
            .collect();

        debug!(service = name, total, online = online.len(), "service lookup");
        Ok(Service {
            name: name.to_string(),
            filter,
            online,
        })
    }
}

//! One-stop client tying leases, discovery and election to one backend.

use std::sync::Arc;

use discover_core::Attributes;
use discover_core::RegistryBackend;
use discover_core::ServiceIdentity;

use crate::config::DirectoryConfig;
use crate::config::ElectionConfig;
use crate::config::LeaseConfig;
use crate::directory::Service;
use crate::directory::ServiceDirectory;
use crate::directory::ServiceFilter;
use crate::election::ElectionCoordinator;
use crate::election::StandbyHandle;
use crate::error::DiscoverError;
use crate::lease::LeaseManager;
use crate::lease::RegistrationHandle;

/// Registry client.
///
/// Cheap to clone; clones share the same registrations. Registrations made
/// through one client are independent of those made through another, even
/// against the same backend.
#[derive(Debug, Clone)]
pub struct DiscoverClient {
    leases: Arc<LeaseManager>,
    directory: ServiceDirectory,
    election: ElectionCoordinator,
}

impl DiscoverClient {
    /// Client with default settings.
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Result<Self, DiscoverError> {
        Self::with_config(backend, LeaseConfig::default(), DirectoryConfig::default(), ElectionConfig::default())
    }

    /// Client with explicit settings, validated up front.
    pub fn with_config(
        backend: Arc<dyn RegistryBackend>,
        lease: LeaseConfig,
        directory: DirectoryConfig,
        election: ElectionConfig,
    ) -> Result<Self, DiscoverError> {
        let leases = Arc::new(LeaseManager::new(backend, lease)?);
        let directory = ServiceDirectory::new(leases.client().clone(), directory)?;
        let election = ElectionCoordinator::new(leases.clone(), election)?;
        Ok(Self {
            leases,
            directory,
            election,
        })
    }

    /// Register an instance that is visible as soon as this returns.
    pub async fn register(
        &self,
        name: &str,
        port: u16,
        ip: &str,
        attributes: Attributes,
    ) -> Result<RegistrationHandle, DiscoverError> {
        self.leases.register(ServiceIdentity::new(name, ip, port), attributes).await
    }

    /// Register a standby that becomes visible once it is the last one left.
    pub async fn register_and_standby(
        &self,
        name: &str,
        port: u16,
        ip: &str,
        attributes: Attributes,
    ) -> Result<StandbyHandle, DiscoverError> {
        self.election.register_and_standby(ServiceIdentity::new(name, ip, port), attributes).await
    }

    /// Online instances of `name` whose attributes contain every entry of `filter`.
    pub async fn service(&self, name: &str, filter: Attributes) -> Result<Service, DiscoverError> {
        self.directory.service(name, ServiceFilter::new(filter)?).await
    }

    /// Online instances of `name` matching a prebuilt filter.
    pub async fn service_with_filter(&self, name: &str, filter: ServiceFilter) -> Result<Service, DiscoverError> {
        self.directory.service(name, filter).await
    }

    /// Lease manager behind this client.
    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    /// Unregister everything created through this client.
    pub async fn shutdown(&self) {
        self.leases.shutdown().await;
    }
}

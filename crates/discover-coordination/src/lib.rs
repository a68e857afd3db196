//! Client-side service registry: leases, discovery and standby election.
//!
//! - [`LeaseManager`]: registrations kept alive by background renewal
//! - [`ServiceDirectory`]: attribute-filtered snapshots of online instances
//! - [`ElectionCoordinator`]: standbys promoted when they are the last one left
//! - [`BackendClient`]: timeouts and retry in front of a [`RegistryBackend`]
//! - [`DiscoverClient`]: all of the above behind one handle
//!
//! ```ignore
//! let client = DiscoverClient::new(InMemoryBackend::new())?;
//! let handle = client.register("foo", 1111, "127.0.0.1", attrs).await?;
//! let service = client.service("foo", Attributes::new()).await?;
//! assert_eq!(service.addresses(), vec!["127.0.0.1:1111"]);
//! ```

pub mod backend_client;
pub mod client;
pub mod config;
pub mod directory;
pub mod election;
pub mod error;
pub mod lease;
pub mod pure;
pub mod types;

#[cfg(test)]
mod test_support;

pub use backend_client::BackendClient;
pub use client::DiscoverClient;
pub use config::DirectoryConfig;
pub use config::ElectionConfig;
pub use config::LeaseConfig;
pub use directory::Instance;
pub use directory::Service;
pub use directory::ServiceDirectory;
pub use directory::ServiceFilter;
pub use discover_core::Attributes;
pub use discover_core::RegistryBackend;
pub use discover_core::ServiceIdentity;
pub use election::ElectionCoordinator;
pub use election::StandbyHandle;
pub use error::DiscoverError;
pub use lease::LeaseManager;
pub use lease::RegistrationHandle;
pub use types::RegistrationState;

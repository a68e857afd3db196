//! Client-side service registry.
//!
//! Registers service instances under leases that renew in the background,
//! answers attribute-filtered "which instances are online" queries, and runs
//! last-one-standing elections for standby instances. The backing store is
//! anything implementing [`RegistryBackend`]; [`InMemoryBackend`] ships for
//! tests and single-process use.
//!
//! ```ignore
//! discover::logging::init();
//! let config = DiscoverConfig::load(Some(Path::new("discover.toml")))?;
//! let client = config.connect(InMemoryBackend::new())?;
//!
//! let handle = client.register("foo", 1111, "127.0.0.1", attrs).await?;
//! let service = client.service("foo", Attributes::new()).await?;
//! handle.unregister().await?;
//! ```

pub mod config;
pub mod logging;

pub use config::ConfigError;
pub use config::DiscoverConfig;
pub use discover_constants as constants;
pub use discover_coordination::BackendClient;
pub use discover_coordination::DirectoryConfig;
pub use discover_coordination::DiscoverClient;
pub use discover_coordination::DiscoverError;
pub use discover_coordination::ElectionConfig;
pub use discover_coordination::ElectionCoordinator;
pub use discover_coordination::Instance;
pub use discover_coordination::LeaseConfig;
pub use discover_coordination::LeaseManager;
pub use discover_coordination::RegistrationHandle;
pub use discover_coordination::RegistrationState;
pub use discover_coordination::Service;
pub use discover_coordination::ServiceDirectory;
pub use discover_coordination::ServiceFilter;
pub use discover_coordination::StandbyHandle;
pub use discover_core::Attributes;
pub use discover_core::BackendError;
pub use discover_core::InMemoryBackend;
pub use discover_core::LeaseGrant;
pub use discover_core::LeaseToken;
pub use discover_core::RecordState;
pub use discover_core::RegistrationMode;
pub use discover_core::RegistrationRecord;
pub use discover_core::RegistryBackend;
pub use discover_core::ServiceIdentity;
pub use discover_time::SystemTimeProvider;
pub use discover_time::TimeProvider;
pub use discover_time::TokioTimeProvider;

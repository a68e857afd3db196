//! Lease manager: registrations that stay alive until told otherwise.
//!
//! Each registration owns a backend lease that a background task renews at
//! `renew_interval_ms`. Registering the same identity again through the same
//! manager updates the live registration in place instead of creating a
//! second one, so there is never an offline gap between the two.
//!
//! ```ignore
//! let manager = LeaseManager::new(backend, LeaseConfig::default())?;
//! let handle = manager.register(ServiceIdentity::new("foo", "127.0.0.1", 1111), attrs).await?;
//! assert!(handle.is_online());
//! handle.unregister().await?;
//! ```

mod handle;
pub(crate) mod registration;
mod renewal;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;

use discover_core::Attributes;
use discover_core::RegistrationMode;
use discover_core::RegistryBackend;
use discover_core::ServiceIdentity;
use discover_core::validation::validate_registration;
pub use handle::RegistrationHandle;
use parking_lot::Mutex;
use registration::Registration;
use tokio::time::Instant;
use tracing::info;
use tracing::warn;

use crate::backend_client::BackendClient;
use crate::config::LeaseConfig;
use crate::error::DiscoverError;
use crate::types::RegistrationState;

/// Owns every registration created through one client.
pub struct LeaseManager {
    client: BackendClient,
    config: LeaseConfig,
    registrations: Mutex<HashMap<ServiceIdentity, Weak<Registration>>>,
}

impl std::fmt::Debug for LeaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseManager")
            .field("config", &self.config)
            .field("registrations", &self.registrations.lock().len())
            .finish_non_exhaustive()
    }
}

impl LeaseManager {
    /// Create a manager after validating `config`.
    pub fn new(backend: Arc<dyn RegistryBackend>, config: LeaseConfig) -> Result<Self, DiscoverError> {
        config.validate()?;
        Ok(Self {
            client: BackendClient::new(backend, &config),
            config,
            registrations: Mutex::new(HashMap::new()),
        })
    }

    /// Backend shim shared with discovery and election.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Lease settings in effect.
    pub fn config(&self) -> &LeaseConfig {
        &self.config
    }

    /// Register an ordinary, immediately visible instance.
    ///
    /// Returns once the backend has acknowledged the registration, so a
    /// lookup issued afterwards sees it. Calling this again for a live
    /// identity replaces its attributes and returns a handle to the same
    /// registration.
    pub async fn register(
        &self,
        identity: ServiceIdentity,
        attributes: Attributes,
    ) -> Result<RegistrationHandle, DiscoverError> {
        let registration = self.acquire(identity, RegistrationMode::Active, attributes).await?;
        Ok(RegistrationHandle::new(registration))
    }

    /// Number of registrations that have not reached a terminal state.
    pub fn live_count(&self) -> usize {
        self.registrations
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .filter(|registration| !registration.state().is_terminal())
            .count()
    }

    /// Unregister everything this manager created.
    ///
    /// Failures are logged; each registration still ends `Unregistered` and
    /// leftover records lapse with their leases.
    pub async fn shutdown(&self) {
        let live: Vec<Arc<Registration>> =
            self.registrations.lock().drain().filter_map(|(_, weak)| weak.upgrade()).collect();
        info!(count = live.len(), "shutting down registrations");

        for registration in live {
            if let Err(error) = registration.unregister().await {
                warn!(identity = %registration.identity(), error = %error, "unregister during shutdown failed");
            }
        }
    }

    /// Create a registration or update the live one for `identity`.
    pub(crate) async fn acquire(
        &self,
        identity: ServiceIdentity,
        mode: RegistrationMode,
        attributes: Attributes,
    ) -> Result<Arc<Registration>, DiscoverError> {
        validate_registration(&identity, &attributes)
            .map_err(|error| DiscoverError::from_backend("register", 0, error))?;

        loop {
            let (registration, created) = self.lookup_or_insert(&identity, mode, &attributes)?;
            if created {
                return self.create(registration).await;
            }

            registration.wait_acknowledged().await;
            if registration.state().is_terminal() {
                continue;
            }
            match registration.update(attributes.clone()).await {
                Ok(()) => return Ok(registration),
                Err(DiscoverError::LeaseLost { .. }) => continue,
                Err(error) => return Err(error),
            }
        }
    }

    fn lookup_or_insert(
        &self,
        identity: &ServiceIdentity,
        mode: RegistrationMode,
        attributes: &Attributes,
    ) -> Result<(Arc<Registration>, bool), DiscoverError> {
        let mut registrations = self.registrations.lock();
        registrations.retain(|_, weak| weak.strong_count() > 0);

        if let Some(existing) = registrations.get(identity).and_then(Weak::upgrade)
            && !existing.state().is_terminal()
        {
            if existing.mode() != mode {
                return Err(DiscoverError::InvalidRegistration {
                    reason: format!("{identity} is already registered as {}", existing.mode().as_str()),
                });
            }
            return Ok((existing, false));
        }

        let registration = Arc::new(Registration::pending(
            identity.clone(),
            mode,
            attributes.clone(),
            self.client.clone(),
            self.config.clone(),
        ));
        registrations.insert(identity.clone(), Arc::downgrade(&registration));
        Ok((registration, true))
    }

    async fn create(&self, registration: Arc<Registration>) -> Result<Arc<Registration>, DiscoverError> {
        let identity = registration.identity().clone();
        let mode = registration.mode();
        let attributes = registration.attributes();

        let sent_at = Instant::now();
        let grant = match self
            .client
            .put(&identity, mode, &attributes, self.config.ttl_ms, self.config.register_max_attempts)
            .await
        {
            Ok(grant) => grant,
            Err(error) => {
                registration.transition(RegistrationState::Unregistered);
                warn!(identity = %identity, error = %error, "registration failed");
                return Err(error);
            }
        };

        let sequence = grant.sequence;
        if !registration.activate(grant, sent_at) {
            // Unregistered while the put was in flight; the record it created must go.
            if let Err(error) = registration.delete_record().await {
                warn!(identity = %identity, error = %error, "delete after cancelled registration failed");
            }
            return Err(DiscoverError::UnregisteredInFlight { identity });
        }

        renewal::spawn_renewal(registration.clone());
        info!(identity = %identity, mode = mode.as_str(), sequence, "registered");
        Ok(registration)
    }
}

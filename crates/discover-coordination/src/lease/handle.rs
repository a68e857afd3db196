//! Owner-facing handle to an ordinary registration.

use std::sync::Arc;

use discover_core::Attributes;
use discover_core::ServiceIdentity;
use tokio::sync::watch;

use super::registration::Registration;
use crate::error::DiscoverError;
use crate::types::RegistrationState;

/// Handle to a registration created by [`crate::LeaseManager::register`].
///
/// Clones refer to the same registration. Dropping every handle does not
/// unregister: the lease keeps renewing until [`RegistrationHandle::unregister`]
/// or [`crate::LeaseManager::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct RegistrationHandle {
    pub(crate) registration: Arc<Registration>,
}

impl RegistrationHandle {
    pub(crate) fn new(registration: Arc<Registration>) -> Self {
        Self { registration }
    }

    /// Identity this handle registered.
    pub fn identity(&self) -> &ServiceIdentity {
        self.registration.identity()
    }

    /// `"<ip>:<port>"` of the registered instance.
    pub fn address(&self) -> String {
        self.registration.identity().address()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistrationState {
        self.registration.state()
    }

    /// True while the registration is visible in discovery.
    pub fn is_online(&self) -> bool {
        self.state().is_visible()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.registration.subscribe()
    }

    /// Attributes as last acknowledged by the backend.
    pub fn attributes(&self) -> Attributes {
        self.registration.attributes()
    }

    /// Backend version of the registration record.
    pub fn version(&self) -> u64 {
        self.registration.version()
    }

    /// Lease deadline last reported by the backend, in Unix milliseconds.
    pub fn lease_expiry_ms(&self) -> u64 {
        self.registration.lease_expiry_ms()
    }

    /// Stop renewing and delete the registration.
    ///
    /// Idempotent: later calls return `Ok(())` without touching the backend.
    /// The state is `Unregistered` when this returns, even on error; an
    /// error means the delete is still being retried in the background and
    /// the record may stay visible until its lease lapses.
    pub async fn unregister(&self) -> Result<(), DiscoverError> {
        self.registration.unregister().await
    }
}

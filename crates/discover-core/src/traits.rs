//! The contract the client core requires of a registry backend.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::BackendError;
use crate::types::Attributes;
use crate::types::LeaseGrant;
use crate::types::LeaseToken;
use crate::types::RegistrationMode;
use crate::types::RegistrationRecord;
use crate::types::ServiceIdentity;

/// Durable registry of service registrations.
///
/// Implementations must be safe to share across every renewal and watch task
/// of one client. No call may hold a lock across an await point that another
/// registration's call needs, so one slow renewal never starves the rest.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Create or update the registration for `identity`.
    ///
    /// Updating an existing, unexpired registration keeps its `lease_id` and
    /// `sequence`, replaces its attributes, bumps its version and extends its
    /// lease by `ttl_ms`.
    async fn put(
        &self,
        identity: &ServiceIdentity,
        mode: RegistrationMode,
        attributes: &Attributes,
        ttl_ms: u64,
    ) -> Result<LeaseGrant, BackendError>;

    /// Extend a lease by the TTL it was granted with.
    ///
    /// Returns the new deadline in Unix milliseconds, or
    /// [`BackendError::LeaseLost`] if the lease lapsed or was replaced.
    async fn renew(&self, token: &LeaseToken) -> Result<u64, BackendError>;

    /// Remove a registration. Deleting an absent identity succeeds.
    async fn delete(&self, identity: &ServiceIdentity) -> Result<(), BackendError>;

    /// All registrations for `service_name`, in creation order.
    async fn list(&self, service_name: &str) -> Result<Vec<RegistrationRecord>, BackendError>;

    /// Flip a standby registration from waiting to elected.
    ///
    /// No-op for active registrations.
    async fn promote(&self, token: &LeaseToken) -> Result<(), BackendError>;

    /// Change notifications for `service_name`.
    ///
    /// The receiver carries a generation counter that moves whenever the set
    /// of registrations for the name changes. Backends without push
    /// notifications return `None` and callers fall back to polling.
    fn watch(&self, _service_name: &str) -> Option<watch::Receiver<u64>> {
        None
    }
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: RegistryBackend + ?Sized> RegistryBackend for std::sync::Arc<T> {
    async fn put(
        &self,
        identity: &ServiceIdentity,
        mode: RegistrationMode,
        attributes: &Attributes,
        ttl_ms: u64,
    ) -> Result<LeaseGrant, BackendError> {
        (**self).put(identity, mode, attributes, ttl_ms).await
    }

    async fn renew(&self, token: &LeaseToken) -> Result<u64, BackendError> {
        (**self).renew(token).await
    }

    async fn delete(&self, identity: &ServiceIdentity) -> Result<(), BackendError> {
        (**self).delete(identity).await
    }

    async fn list(&self, service_name: &str) -> Result<Vec<RegistrationRecord>, BackendError> {
        (**self).list(service_name).await
    }

    async fn promote(&self, token: &LeaseToken) -> Result<(), BackendError> {
        (**self).promote(token).await
    }

    fn watch(&self, service_name: &str) -> Option<watch::Receiver<u64>> {
        (**self).watch(service_name)
    }
}

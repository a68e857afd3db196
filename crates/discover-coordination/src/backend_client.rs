//! Thin layer between the client core and a [`RegistryBackend`].
//!
//! Adds a deadline to every call and bounded retry with jittered backoff for
//! transient failures. Lease loss and rejected input are returned at once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use discover_constants::lease::MAX_RETRY_ATTEMPTS;
use discover_core::Attributes;
use discover_core::BackendError;
use discover_core::LeaseGrant;
use discover_core::LeaseToken;
use discover_core::RegistrationMode;
use discover_core::RegistrationRecord;
use discover_core::RegistryBackend;
use discover_core::ServiceIdentity;
use tokio::sync::watch;
use tracing::debug;
use tracing::warn;

use crate::config::LeaseConfig;
use crate::error::DiscoverError;
use crate::pure::compute_backoff_with_jitter;

/// Shared handle to a backend with timeouts and retry applied.
///
/// Cloning is cheap; every registration task holds its own clone.
#[derive(Clone)]
pub struct BackendClient {
    backend: Arc<dyn RegistryBackend>,
    call_timeout: Duration,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("call_timeout", &self.call_timeout)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Wrap `backend` using the call timeout and backoff bounds of `config`.
    pub fn new(backend: Arc<dyn RegistryBackend>, config: &LeaseConfig) -> Self {
        Self {
            backend,
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            initial_backoff_ms: config.renew_initial_backoff_ms,
            max_backoff_ms: config.renew_max_backoff_ms,
        }
    }

    /// Create or update a registration, retrying transient failures.
    pub async fn put(
        &self,
        identity: &ServiceIdentity,
        mode: RegistrationMode,
        attributes: &Attributes,
        ttl_ms: u64,
        max_attempts: u32,
    ) -> Result<LeaseGrant, DiscoverError> {
        self.with_retry("put", max_attempts, || self.backend.put(identity, mode, attributes, ttl_ms)).await
    }

    /// One renewal attempt. The renewal loop owns its own retry policy.
    pub async fn renew_once(&self, token: &LeaseToken) -> Result<u64, BackendError> {
        self.timed("renew", self.backend.renew(token)).await
    }

    /// One delete attempt.
    pub async fn delete_once(&self, identity: &ServiceIdentity) -> Result<(), BackendError> {
        self.timed("delete", self.backend.delete(identity)).await
    }

    /// Delete with retry.
    pub async fn delete(&self, identity: &ServiceIdentity, max_attempts: u32) -> Result<(), DiscoverError> {
        self.with_retry("delete", max_attempts, || self.backend.delete(identity)).await
    }

    /// One list attempt.
    pub async fn list_once(&self, service_name: &str) -> Result<Vec<RegistrationRecord>, BackendError> {
        self.timed("list", self.backend.list(service_name)).await
    }

    /// List with retry.
    pub async fn list(&self, service_name: &str, max_attempts: u32) -> Result<Vec<RegistrationRecord>, DiscoverError> {
        self.with_retry("list", max_attempts, || self.backend.list(service_name)).await
    }

    /// One promotion attempt.
    pub async fn promote(&self, token: &LeaseToken) -> Result<(), BackendError> {
        self.timed("promote", self.backend.promote(token)).await
    }

    /// Change notifications for a service name, if the backend has them.
    pub fn watch(&self, service_name: &str) -> Option<watch::Receiver<u64>> {
        self.backend.watch(service_name)
    }

    async fn timed<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                debug!(operation, timeout_ms = self.call_timeout.as_millis() as u64, "backend call timed out");
                Err(BackendError::Unavailable {
                    reason: format!("{operation} timed out after {}ms", self.call_timeout.as_millis()),
                })
            }
        }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        max_attempts: u32,
        mut call: F,
    ) -> Result<T, DiscoverError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_attempts = max_attempts.clamp(1, MAX_RETRY_ATTEMPTS);
        let mut backoff_ms = self.initial_backoff_ms;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let error = match self.timed(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_transient() || attempt >= max_attempts {
                return Err(DiscoverError::from_backend(operation, attempt, error));
            }

            let step = compute_backoff_with_jitter(backoff_ms, self.max_backoff_ms, rand::random::<u64>());
            warn!(
                operation,
                attempt,
                max_attempts,
                retry_in_ms = step.sleep_ms,
                error = %error,
                "registry backend call failed, retrying"
            );
            tokio::time::sleep(Duration::from_millis(step.sleep_ms)).await;
            backoff_ms = step.next_backoff_ms;
        }
    }
}

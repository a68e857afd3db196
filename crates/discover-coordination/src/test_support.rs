//! Backend wrapper that counts calls and injects per-operation faults.

use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use discover_core::Attributes;
use discover_core::BackendError;
use discover_core::InMemoryBackend;
use discover_core::LeaseGrant;
use discover_core::LeaseToken;
use discover_core::RegistrationMode;
use discover_core::RegistrationRecord;
use discover_core::RegistryBackend;
use discover_core::ServiceIdentity;
use parking_lot::Mutex;
use tokio::sync::watch;

pub(crate) struct CountingBackend {
    inner: Arc<InMemoryBackend>,
    renews: AtomicU32,
    deletes: AtomicU32,
    lists: AtomicU32,
    stalled_port: Mutex<Option<u16>>,
    put_delay: Mutex<Option<Duration>>,
    failing_deletes: AtomicU32,
}

impl CountingBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryBackend::new(),
            renews: AtomicU32::new(0),
            deletes: AtomicU32::new(0),
            lists: AtomicU32::new(0),
            stalled_port: Mutex::new(None),
            put_delay: Mutex::new(None),
            failing_deletes: AtomicU32::new(0),
        })
    }

    pub(crate) fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Renewals for `port` never answer from now on.
    pub(crate) fn stall_renewals_for(&self, port: u16) {
        *self.stalled_port.lock() = Some(port);
    }

    /// Every put waits `delay` before reaching the store.
    pub(crate) fn delay_puts(&self, delay: Duration) {
        *self.put_delay.lock() = Some(delay);
    }

    /// The next `count` deletes fail with `Unavailable`.
    pub(crate) fn fail_next_deletes(&self, count: u32) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }

    pub(crate) fn renews(&self) -> u32 {
        self.renews.load(Ordering::SeqCst)
    }

    pub(crate) fn deletes(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    pub(crate) fn lists(&self) -> u32 {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryBackend for CountingBackend {
    async fn put(
        &self,
        identity: &ServiceIdentity,
        mode: RegistrationMode,
        attributes: &Attributes,
        ttl_ms: u64,
    ) -> Result<LeaseGrant, BackendError> {
        let delay = *self.put_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.put(identity, mode, attributes, ttl_ms).await
    }

    async fn renew(&self, token: &LeaseToken) -> Result<u64, BackendError> {
        self.renews.fetch_add(1, Ordering::SeqCst);
        let stalled = *self.stalled_port.lock();
        if stalled == Some(token.identity.port) {
            return std::future::pending().await;
        }
        self.inner.renew(token).await
    }

    async fn delete(&self, identity: &ServiceIdentity) -> Result<(), BackendError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(BackendError::Unavailable {
                reason: "delete: injected failure".to_string(),
            });
        }
        self.inner.delete(identity).await
    }

    async fn list(&self, service_name: &str) -> Result<Vec<RegistrationRecord>, BackendError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(service_name).await
    }

    async fn promote(&self, token: &LeaseToken) -> Result<(), BackendError> {
        self.inner.promote(token).await
    }

    fn watch(&self, service_name: &str) -> Option<watch::Receiver<u64>> {
        self.inner.watch(service_name)
    }
}

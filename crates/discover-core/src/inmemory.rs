//! In-memory registry backend.
//!
//! Keeps every registration in a lock-protected map keyed by service name,
//! with records in creation order. Lease deadlines come from an injected
//! [`TimeProvider`]; lapsed records are reported as [`RecordState::Expired`]
//! by the next `list` and purged.
//!
//! Fault injection for tests:
//! - [`InMemoryBackend::set_available`] takes the whole backend offline
//! - [`InMemoryBackend::fail_next`] fails the next N calls with `Unavailable`
//!
//! # Limitations
//!
//! - Single-process only (no replication, no persistence)
//! - Expiry is evaluated lazily on access, not by a timer

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use discover_constants::registry::MAX_REGISTRATIONS_PER_SERVICE;
use discover_time::TimeProvider;
use discover_time::TokioTimeProvider;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;
use tracing::trace;

use crate::error::BackendError;
use crate::traits::RegistryBackend;
use crate::types::Attributes;
use crate::types::LeaseGrant;
use crate::types::LeaseToken;
use crate::types::RecordState;
use crate::types::RegistrationMode;
use crate::types::RegistrationRecord;
use crate::types::ServiceIdentity;
use crate::validation::validate_registration;
use crate::validation::validate_service_name;

#[derive(Debug, Clone)]
struct StoredRecord {
    record: RegistrationRecord,
    lease_id: u64,
    ttl_ms: u64,
}

impl StoredRecord {
    fn is_lapsed(&self, now_ms: u64) -> bool {
        now_ms >= self.record.lease_expiry_ms
    }
}

#[derive(Default)]
struct State {
    /// Records per service name, in creation (sequence) order.
    services: HashMap<String, Vec<StoredRecord>>,
    /// Change generation senders per service name.
    generations: HashMap<String, watch::Sender<u64>>,
    next_sequence: u64,
    next_lease_id: u64,
}

impl State {
    fn bump_generation(&mut self, service_name: &str) {
        if let Some(tx) = self.generations.get(service_name) {
            tx.send_modify(|generation| *generation = generation.wrapping_add(1));
        }
    }

    /// Drop generation senders nobody listens to for services with no records.
    fn prune_generations(&mut self) {
        let services = &self.services;
        self.generations
            .retain(|name, tx| tx.receiver_count() > 0 || services.contains_key(name));
    }

    /// Drop lapsed records for a service, returning them.
    fn purge_lapsed(&mut self, service_name: &str, now_ms: u64) -> Vec<StoredRecord> {
        let Some(records) = self.services.get_mut(service_name) else {
            return Vec::new();
        };
        let (lapsed, live): (Vec<_>, Vec<_>) = records.drain(..).partition(|r| r.is_lapsed(now_ms));
        *records = live;
        if records.is_empty() {
            self.services.remove(service_name);
        }
        if !lapsed.is_empty() {
            debug!(service = service_name, expired = lapsed.len(), "purged lapsed registrations");
            self.bump_generation(service_name);
        }
        lapsed
    }

    fn find_mut(&mut self, identity: &ServiceIdentity) -> Option<&mut StoredRecord> {
        self.services
            .get_mut(&identity.service_name)?
            .iter_mut()
            .find(|r| r.record.identity == *identity)
    }
}

/// Registry backend held entirely in process memory.
pub struct InMemoryBackend {
    state: Mutex<State>,
    time: Arc<dyn TimeProvider>,
    available: AtomicBool,
    pending_failures: AtomicU32,
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("time", &self.time)
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl InMemoryBackend {
    /// Backend whose lease clock follows tokio's clock.
    pub fn new() -> Arc<Self> {
        Self::with_time_provider(Arc::new(TokioTimeProvider::new()))
    }

    /// Backend with an explicit lease clock.
    pub fn with_time_provider(time: Arc<dyn TimeProvider>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
            time,
            available: AtomicBool::new(true),
            pending_failures: AtomicU32::new(0),
        })
    }

    /// Take the backend offline (`false`) or bring it back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fail the next `count` calls with `Unavailable`, then recover.
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of service names with a live change-notification channel.
    pub fn watched_services(&self) -> usize {
        self.state.lock().generations.len()
    }

    /// Current record for an identity, ignoring expiry.
    pub fn get(&self, identity: &ServiceIdentity) -> Option<RegistrationRecord> {
        let state = self.state.lock();
        state
            .services
            .get(&identity.service_name)?
            .iter()
            .find(|r| r.record.identity == *identity)
            .map(|r| r.record.clone())
    }

    fn check_available(&self, operation: &str) -> Result<(), BackendError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable {
                reason: format!("{operation}: backend offline"),
            });
        }
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(BackendError::Unavailable {
                reason: format!("{operation}: injected failure"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryBackend for InMemoryBackend {
    async fn put(
        &self,
        identity: &ServiceIdentity,
        mode: RegistrationMode,
        attributes: &Attributes,
        ttl_ms: u64,
    ) -> Result<LeaseGrant, BackendError> {
        self.check_available("put")?;
        validate_registration(identity, attributes)?;

        let now = self.time.now_unix_ms();
        let lease_expiry_ms = now.saturating_add(ttl_ms);
        let mut state = self.state.lock();
        state.purge_lapsed(&identity.service_name, now);

        if let Some(stored) = state.find_mut(identity) {
            stored.record.mode = mode;
            stored.record.state = match (mode, stored.record.state) {
                (RegistrationMode::Active, _) => RecordState::Active,
                (RegistrationMode::Standby, RecordState::Elected) => RecordState::Elected,
                (RegistrationMode::Standby, _) => RecordState::Waiting,
            };
            stored.record.attributes = attributes.clone();
            stored.record.version = stored.record.version.saturating_add(1);
            stored.record.lease_expiry_ms = lease_expiry_ms;
            stored.ttl_ms = ttl_ms;

            let grant = LeaseGrant {
                token: LeaseToken {
                    identity: identity.clone(),
                    lease_id: stored.lease_id,
                },
                lease_expiry_ms,
                version: stored.record.version,
                sequence: stored.record.sequence,
            };
            trace!(identity = %identity, version = grant.version, "registration updated in place");
            state.bump_generation(&identity.service_name);
            return Ok(grant);
        }

        let count = state.services.get(&identity.service_name).map_or(0, Vec::len) as u32;
        if count >= MAX_REGISTRATIONS_PER_SERVICE {
            return Err(BackendError::ServiceFull {
                service_name: identity.service_name.clone(),
                count,
                max: MAX_REGISTRATIONS_PER_SERVICE,
            });
        }

        state.next_sequence = state.next_sequence.saturating_add(1);
        state.next_lease_id = state.next_lease_id.saturating_add(1);
        let sequence = state.next_sequence;
        let lease_id = state.next_lease_id;

        let record = RegistrationRecord {
            identity: identity.clone(),
            mode,
            attributes: attributes.clone(),
            state: match mode {
                RegistrationMode::Active => RecordState::Active,
                RegistrationMode::Standby => RecordState::Waiting,
            },
            version: 1,
            sequence,
            lease_expiry_ms,
        };
        state.services.entry(identity.service_name.clone()).or_default().push(StoredRecord {
            record,
            lease_id,
            ttl_ms,
        });
        state.bump_generation(&identity.service_name);
        trace!(identity = %identity, sequence, lease_id, mode = mode.as_str(), "registration created");

        Ok(LeaseGrant {
            token: LeaseToken {
                identity: identity.clone(),
                lease_id,
            },
            lease_expiry_ms,
            version: 1,
            sequence,
        })
    }

    async fn renew(&self, token: &LeaseToken) -> Result<u64, BackendError> {
        self.check_available("renew")?;

        let now = self.time.now_unix_ms();
        let mut state = self.state.lock();
        state.purge_lapsed(&token.identity.service_name, now);

        match state.find_mut(&token.identity) {
            Some(stored) if stored.lease_id == token.lease_id => {
                stored.record.lease_expiry_ms = now.saturating_add(stored.ttl_ms);
                Ok(stored.record.lease_expiry_ms)
            }
            _ => Err(BackendError::LeaseLost {
                identity: token.identity.clone(),
            }),
        }
    }

    async fn delete(&self, identity: &ServiceIdentity) -> Result<(), BackendError> {
        self.check_available("delete")?;

        let mut state = self.state.lock();
        let Some(records) = state.services.get_mut(&identity.service_name) else {
            return Ok(());
        };
        let before = records.len();
        records.retain(|r| r.record.identity != *identity);
        let removed = records.len() != before;
        if records.is_empty() {
            state.services.remove(&identity.service_name);
        }
        if removed {
            state.bump_generation(&identity.service_name);
            state.prune_generations();
            trace!(identity = %identity, "registration deleted");
        }
        Ok(())
    }

    async fn list(&self, service_name: &str) -> Result<Vec<RegistrationRecord>, BackendError> {
        self.check_available("list")?;
        validate_service_name(service_name).map_err(|reason| BackendError::InvalidRegistration { reason })?;

        let now = self.time.now_unix_ms();
        let mut state = self.state.lock();
        let mut records: Vec<RegistrationRecord> = state
            .services
            .get(service_name)
            .map(|records| records.iter().map(|r| r.record.clone()).collect())
            .unwrap_or_default();

        for record in &mut records {
            if now >= record.lease_expiry_ms {
                record.state = RecordState::Expired;
            }
        }
        state.purge_lapsed(service_name, now);

        Ok(records)
    }

    async fn promote(&self, token: &LeaseToken) -> Result<(), BackendError> {
        self.check_available("promote")?;

        let now = self.time.now_unix_ms();
        let mut state = self.state.lock();
        state.purge_lapsed(&token.identity.service_name, now);

        let promoted = match state.find_mut(&token.identity) {
            Some(stored) if stored.lease_id == token.lease_id => {
                if stored.record.state == RecordState::Waiting {
                    stored.record.state = RecordState::Elected;
                    true
                } else {
                    false
                }
            }
            _ => {
                return Err(BackendError::LeaseLost {
                    identity: token.identity.clone(),
                });
            }
        };
        if promoted {
            state.bump_generation(&token.identity.service_name);
        }
        Ok(())
    }

    fn watch(&self, service_name: &str) -> Option<watch::Receiver<u64>> {
        let mut state = self.state.lock();
        state.prune_generations();
        let tx = state.generations.entry(service_name.to_string()).or_insert_with(|| watch::channel(0).0);
        Some(tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn foo(port: u16) -> ServiceIdentity {
        ServiceIdentity::new("foo", "127.0.0.1", port)
    }

    #[tokio::test]
    async fn put_then_list_returns_active_record() {
        let backend = InMemoryBackend::new();
        let grant = backend.put(&foo(1111), RegistrationMode::Active, &attrs(&[("foo", "bar")]), 1_000).await.unwrap();

        let records = backend.list("foo").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, RecordState::Active);
        assert_eq!(records[0].version, 1);
        assert_eq!(records[0].sequence, grant.sequence);
    }

    #[tokio::test]
    async fn put_same_identity_updates_in_place() {
        let backend = InMemoryBackend::new();
        let first = backend.put(&foo(1111), RegistrationMode::Active, &attrs(&[("foo", "bar")]), 1_000).await.unwrap();
        let second = backend.put(&foo(1111), RegistrationMode::Active, &attrs(&[("foo", "baz")]), 1_000).await.unwrap();

        assert_eq!(first.token, second.token);
        assert_eq!(first.sequence, second.sequence);
        assert_eq!(second.version, 2);

        let records = backend.list("foo").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attributes, attrs(&[("foo", "baz")]));
    }

    #[tokio::test]
    async fn list_preserves_creation_order_across_updates() {
        let backend = InMemoryBackend::new();
        backend.put(&foo(2222), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();
        backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();
        backend.put(&foo(2222), RegistrationMode::Active, &attrs(&[("a", "b")]), 1_000).await.unwrap();

        let ports: Vec<u16> = backend.list("foo").await.unwrap().iter().map(|r| r.identity.port).collect();
        assert_eq!(ports, vec![2222, 1111]);
    }

    #[tokio::test]
    async fn standby_starts_waiting_and_promotes() {
        let backend = InMemoryBackend::new();
        let grant = backend.put(&foo(1111), RegistrationMode::Standby, &Attributes::new(), 1_000).await.unwrap();
        assert_eq!(backend.get(&foo(1111)).unwrap().state, RecordState::Waiting);

        backend.promote(&grant.token).await.unwrap();
        assert_eq!(backend.get(&foo(1111)).unwrap().state, RecordState::Elected);

        // Re-putting an elected standby keeps it elected.
        backend.put(&foo(1111), RegistrationMode::Standby, &Attributes::new(), 1_000).await.unwrap();
        assert_eq!(backend.get(&foo(1111)).unwrap().state, RecordState::Elected);
    }

    #[tokio::test(start_paused = true)]
    async fn lapsed_lease_is_reported_expired_then_purged() {
        let backend = InMemoryBackend::new();
        let grant = backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();

        tokio::time::advance(Duration::from_millis(1_001)).await;

        let records = backend.list("foo").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, RecordState::Expired);
        assert!(backend.list("foo").await.unwrap().is_empty());

        assert!(matches!(backend.renew(&grant.token).await, Err(BackendError::LeaseLost { .. })));
    }

    #[tokio::test]
    async fn expiry_follows_the_injected_clock() {
        let time = Arc::new(discover_time::SimulatedTimeProvider::new(1_000_000));
        let backend = InMemoryBackend::with_time_provider(time.clone());
        let grant = backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 500).await.unwrap();
        assert_eq!(grant.lease_expiry_ms, 1_000_500);

        time.advance_ms(499);
        assert_eq!(backend.list("foo").await.unwrap()[0].state, RecordState::Active);

        time.advance_ms(1);
        assert_eq!(backend.list("foo").await.unwrap()[0].state, RecordState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn renew_extends_the_deadline() {
        let backend = InMemoryBackend::new();
        let grant = backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();

        tokio::time::advance(Duration::from_millis(600)).await;
        let expiry = backend.renew(&grant.token).await.unwrap();
        assert_eq!(expiry, grant.lease_expiry_ms + 600);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(backend.list("foo").await.unwrap()[0].state, RecordState::Active);
    }

    #[tokio::test]
    async fn renew_with_stale_lease_id_is_lost() {
        let backend = InMemoryBackend::new();
        let grant = backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();
        backend.delete(&foo(1111)).await.unwrap();
        backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();

        assert!(matches!(backend.renew(&grant.token).await, Err(BackendError::LeaseLost { .. })));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = InMemoryBackend::new();
        backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();
        backend.delete(&foo(1111)).await.unwrap();
        backend.delete(&foo(1111)).await.unwrap();
        assert!(backend.list("foo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_generation_moves_on_changes() {
        let backend = InMemoryBackend::new();
        let mut rx = backend.watch("foo").unwrap();
        let start = *rx.borrow_and_update();

        backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update() > start);

        backend.delete(&foo(1111)).await.unwrap();
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn idle_watch_channels_are_pruned() {
        let backend = InMemoryBackend::new();
        drop(backend.watch("gone").unwrap());
        let kept = backend.watch("kept").unwrap();
        assert_eq!(backend.watched_services(), 1);

        // A name with records keeps its channel without listeners.
        let listener = backend.watch("foo").unwrap();
        backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap();
        drop(listener);
        drop(backend.watch("other").unwrap());
        assert_eq!(backend.watched_services(), 3);

        backend.delete(&foo(1111)).await.unwrap();
        assert_eq!(backend.watched_services(), 1);
        drop(kept);
    }

    #[tokio::test]
    async fn offline_backend_rejects_everything() {
        let backend = InMemoryBackend::new();
        backend.set_available(false);
        let err = backend.put(&foo(1111), RegistrationMode::Active, &Attributes::new(), 1_000).await.unwrap_err();
        assert!(err.is_transient());
        assert!(backend.list("foo").await.is_err());

        backend.set_available(true);
        assert!(backend.list("foo").await.is_ok());
    }

    #[tokio::test]
    async fn fail_next_recovers_after_count() {
        let backend = InMemoryBackend::new();
        backend.fail_next(2);
        assert!(backend.list("foo").await.is_err());
        assert!(backend.list("foo").await.is_err());
        assert!(backend.list("foo").await.is_ok());
    }

    #[tokio::test]
    async fn invalid_identity_is_rejected() {
        let backend = InMemoryBackend::new();
        let err = backend
            .put(&ServiceIdentity::new("foo", "127.0.0.1", 0), RegistrationMode::Active, &Attributes::new(), 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidRegistration { .. }));
    }
}

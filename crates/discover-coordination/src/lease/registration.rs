//! Shared state of one registration.
//!
//! Every handle clone, the renewal task and (for standbys) the election task
//! hold an `Arc<Registration>`. State changes go through a watch channel so
//! owners can observe them without polling.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use discover_core::Attributes;
use discover_core::BackendError;
use discover_core::LeaseGrant;
use discover_core::LeaseToken;
use discover_core::RegistrationMode;
use discover_core::ServiceIdentity;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend_client::BackendClient;
use crate::config::LeaseConfig;
use crate::error::DiscoverError;
use crate::pure::is_valid_transition;
use crate::types::RegistrationState;

#[derive(Debug, Clone)]
struct LeaseInfo {
    /// Absent until the backend acknowledges the first put.
    token: Option<LeaseToken>,
    lease_expiry_ms: u64,
    /// When the lease lapses by the client's own clock.
    local_deadline: Instant,
    version: u64,
    sequence: u64,
    attributes: Attributes,
}

pub(crate) struct Registration {
    identity: ServiceIdentity,
    mode: RegistrationMode,
    state_tx: watch::Sender<RegistrationState>,
    lease: Mutex<LeaseInfo>,
    cancel: CancellationToken,
    client: BackendClient,
    config: LeaseConfig,
    election_started: AtomicBool,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("identity", &self.identity)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Registration {
    pub(crate) fn pending(
        identity: ServiceIdentity,
        mode: RegistrationMode,
        attributes: Attributes,
        client: BackendClient,
        config: LeaseConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(RegistrationState::Pending);
        Self {
            identity,
            mode,
            state_tx,
            lease: Mutex::new(LeaseInfo {
                token: None,
                lease_expiry_ms: 0,
                local_deadline: Instant::now(),
                version: 0,
                sequence: 0,
                attributes,
            }),
            cancel: CancellationToken::new(),
            client,
            config,
            election_started: AtomicBool::new(false),
        }
    }

    pub(crate) fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub(crate) fn mode(&self) -> RegistrationMode {
        self.mode
    }

    pub(crate) fn config(&self) -> &LeaseConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &BackendClient {
        &self.client
    }

    pub(crate) fn state(&self) -> RegistrationState {
        *self.state_tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn token(&self) -> Option<LeaseToken> {
        self.lease.lock().token.clone()
    }

    pub(crate) fn version(&self) -> u64 {
        self.lease.lock().version
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.lease.lock().sequence
    }

    pub(crate) fn lease_expiry_ms(&self) -> u64 {
        self.lease.lock().lease_expiry_ms
    }

    pub(crate) fn attributes(&self) -> Attributes {
        self.lease.lock().attributes.clone()
    }

    /// Time left on the lease by the client's clock.
    pub(crate) fn remaining_lease(&self) -> Duration {
        self.lease.lock().local_deadline.saturating_duration_since(Instant::now())
    }

    /// Apply a state change if the lifecycle allows it.
    ///
    /// Returns `true` if the state changed. Receivers are only woken on an
    /// actual change.
    pub(crate) fn transition(&self, next: RegistrationState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if is_valid_transition(*state, next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Claim the right to run the election task. Only the first caller wins.
    pub(crate) fn claim_election(&self) -> bool {
        self.election_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Record the first acknowledged put and leave `Pending`.
    pub(crate) fn activate(&self, grant: LeaseGrant, sent_at: Instant) -> bool {
        self.record_grant(grant, None, sent_at);
        let next = match self.mode {
            RegistrationMode::Active => RegistrationState::Active,
            RegistrationMode::Standby => RegistrationState::Waiting,
        };
        self.transition(next)
    }

    pub(crate) fn record_renewal(&self, lease_expiry_ms: u64, sent_at: Instant) {
        let mut lease = self.lease.lock();
        lease.lease_expiry_ms = lease_expiry_ms;
        lease.local_deadline = sent_at + Duration::from_millis(self.config.ttl_ms);
    }

    fn record_grant(&self, grant: LeaseGrant, attributes: Option<Attributes>, sent_at: Instant) {
        let mut lease = self.lease.lock();
        if lease.token.as_ref().is_some_and(|token| *token != grant.token) {
            debug!(identity = %self.identity, lease_id = grant.token.lease_id, "backend issued a new lease");
        }
        lease.token = Some(grant.token);
        lease.lease_expiry_ms = grant.lease_expiry_ms;
        lease.local_deadline = sent_at + Duration::from_millis(self.config.ttl_ms);
        lease.version = grant.version;
        lease.sequence = grant.sequence;
        if let Some(attributes) = attributes {
            lease.attributes = attributes;
        }
    }

    /// Wait until the first put has been answered one way or the other.
    pub(crate) async fn wait_acknowledged(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|state| *state != RegistrationState::Pending).await;
    }

    /// Replace the attributes in place, keeping the lease and sequence.
    pub(crate) async fn update(&self, attributes: Attributes) -> Result<(), DiscoverError> {
        let sent_at = Instant::now();
        let grant = self
            .client
            .put(&self.identity, self.mode, &attributes, self.config.ttl_ms, self.config.register_max_attempts)
            .await?;

        if self.state().is_terminal() {
            return Err(DiscoverError::LeaseLost {
                identity: self.identity.clone(),
            });
        }

        let version = grant.version;
        self.record_grant(grant, Some(attributes), sent_at);
        info!(identity = %self.identity, version, "registration updated");
        Ok(())
    }

    /// Move to `Expired` and stop all tasks of this registration.
    pub(crate) fn expire(&self, reason: &str) {
        if self.transition(RegistrationState::Expired) {
            warn!(identity = %self.identity, reason, "registration expired");
            self.cancel.cancel();
        }
    }

    /// Stop renewing and remove the registration from the backend.
    ///
    /// The state change and task cancellation happen before any backend
    /// call, so the owner observes `Unregistered` at once. One delete is
    /// attempted inline; if it fails the remaining attempts run in the
    /// background and the failure is returned.
    pub(crate) async fn unregister(&self) -> Result<(), DiscoverError> {
        if !self.transition(RegistrationState::Unregistered) {
            return Ok(());
        }
        self.cancel.cancel();
        info!(identity = %self.identity, "unregistering");

        self.delete_record().await.map_err(|error| DiscoverError::from_backend("delete", 1, error))?;
        debug!(identity = %self.identity, "registration deleted");
        Ok(())
    }

    /// Delete the backend record once inline.
    ///
    /// A transient failure hands the remaining delete attempts to a
    /// background task and is still returned.
    pub(crate) async fn delete_record(&self) -> Result<(), BackendError> {
        let result = self.client.delete_once(&self.identity).await;
        if let Err(error) = &result {
            let remaining = self.config.delete_max_attempts.saturating_sub(1);
            if error.is_transient() && remaining > 0 {
                spawn_deferred_delete(self.client.clone(), self.identity.clone(), remaining);
            }
        }
        result
    }
}

fn spawn_deferred_delete(client: BackendClient, identity: ServiceIdentity, attempts: u32) {
    tokio::spawn(async move {
        match client.delete(&identity, attempts).await {
            Ok(()) => info!(identity = %identity, "deferred delete succeeded"),
            Err(error) => warn!(
                identity = %identity,
                error = %error,
                "abandoning delete, registration will lapse with its lease"
            ),
        }
    });
}

//! Standby registrations with last-one-standing election.
//!
//! A standby holds a lease like any other registration but stays out of
//! discovery. A watch task re-evaluates the service's records whenever the
//! backend reports a change (or every `poll_interval_ms` without one) and
//! promotes the standby once it is the only one left.
//!
//! # Properties
//!
//! 1. **Sticky**: once elected, a standby stays elected until it expires or
//!    unregisters, even if new instances appear.
//! 2. **Single winner**: when several standbys are waiting, the earliest one
//!    by backend sequence wins; the rest see it as a competitor after its
//!    promotion.
//! 3. **Valid transitions**: Waiting -> Elected | Expired | Unregistered,
//!    Elected -> Expired | Unregistered.

use std::sync::Arc;
use std::time::Duration;

use discover_core::Attributes;
use discover_core::BackendError;
use discover_core::RegistrationMode;
use discover_core::ServiceIdentity;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::ElectionConfig;
use crate::error::DiscoverError;
use crate::lease::LeaseManager;
use crate::lease::registration::Registration;
use crate::pure::ElectionDecision;
use crate::pure::decide_election;
use crate::types::RegistrationState;

/// Creates standby registrations and runs their elections.
#[derive(Debug, Clone)]
pub struct ElectionCoordinator {
    leases: Arc<LeaseManager>,
    config: ElectionConfig,
}

impl ElectionCoordinator {
    /// Coordinator creating its leases through `leases`.
    pub fn new(leases: Arc<LeaseManager>, config: ElectionConfig) -> Result<Self, DiscoverError> {
        config.validate()?;
        Ok(Self { leases, config })
    }

    /// Register `identity` as a standby and start watching for election.
    ///
    /// Returns once the backend has acknowledged the standby, in state
    /// `Waiting`. If the identity is already a live standby of this client,
    /// its attributes are updated and the existing election continues.
    pub async fn register_and_standby(
        &self,
        identity: ServiceIdentity,
        attributes: Attributes,
    ) -> Result<StandbyHandle, DiscoverError> {
        let registration = self.leases.acquire(identity, RegistrationMode::Standby, attributes).await?;

        if registration.claim_election() {
            spawn_election(registration.clone(), Duration::from_millis(self.config.poll_interval_ms));
        }
        Ok(StandbyHandle { registration })
    }
}

/// Handle to a standby registration.
///
/// Clones refer to the same registration. Dropping every handle leaves the
/// standby running.
#[derive(Debug, Clone)]
pub struct StandbyHandle {
    registration: Arc<Registration>,
}

impl StandbyHandle {
    /// Identity this handle registered.
    pub fn identity(&self) -> &ServiceIdentity {
        self.registration.identity()
    }

    /// `"<ip>:<port>"` of the standby instance.
    pub fn address(&self) -> String {
        self.registration.identity().address()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistrationState {
        self.registration.state()
    }

    /// True once this standby has won its election and is still alive.
    pub fn is_elected(&self) -> bool {
        self.state() == RegistrationState::Elected
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.registration.subscribe()
    }

    /// Wait for the election outcome.
    ///
    /// Returns `true` once elected, `false` if the standby expired or was
    /// unregistered first.
    pub async fn wait_elected(&self) -> bool {
        let mut rx = self.subscribe();
        match rx
            .wait_for(|state| *state == RegistrationState::Elected || state.is_terminal())
            .await
        {
            Ok(state) => *state == RegistrationState::Elected,
            Err(_) => false,
        }
    }

    /// Stop the election and the lease, and delete the registration.
    ///
    /// Same semantics as [`crate::RegistrationHandle::unregister`].
    pub async fn unregister(&self) -> Result<(), DiscoverError> {
        self.registration.unregister().await
    }
}

fn spawn_election(registration: Arc<Registration>, poll_interval: Duration) {
    tokio::spawn(election_task(registration, poll_interval));
}

async fn election_task(registration: Arc<Registration>, poll_interval: Duration) {
    let service_name = registration.identity().service_name.clone();
    let client = registration.client().clone();
    let cancel = registration.cancel_token();
    let mut changes = client.watch(&service_name);

    debug!(
        identity = %registration.identity(),
        push = changes.is_some(),
        poll_interval_ms = poll_interval.as_millis() as u64,
        "election watch started"
    );

    while registration.state() == RegistrationState::Waiting {
        match client.list_once(&service_name).await {
            Ok(records) => match decide_election(registration.identity(), &records) {
                ElectionDecision::Elect => {
                    if promote(&registration).await {
                        break;
                    }
                }
                ElectionDecision::Wait { competitors } => {
                    debug!(identity = %registration.identity(), competitors, "standby waiting");
                }
                ElectionDecision::Defer { leader_sequence } => {
                    debug!(identity = %registration.identity(), leader_sequence, "deferring to earlier standby");
                }
                ElectionDecision::Absent => {
                    debug!(identity = %registration.identity(), "own record not listed");
                }
            },
            Err(error) => {
                debug!(identity = %registration.identity(), error = %error, "election re-evaluation failed");
            }
        }

        let changed = async {
            match changes.as_mut() {
                Some(rx) => {
                    if rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = changed => {}
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    debug!(identity = %registration.identity(), state = %registration.state(), "election watch stopped");
}

/// Returns `true` when the task has nothing left to do.
async fn promote(registration: &Registration) -> bool {
    let Some(token) = registration.token() else {
        return false;
    };
    match registration.client().promote(&token).await {
        Ok(()) => {
            if registration.transition(RegistrationState::Elected) {
                info!(
                    identity = %registration.identity(),
                    sequence = registration.sequence(),
                    "standby elected"
                );
            }
            true
        }
        Err(BackendError::LeaseLost { .. }) => {
            registration.expire("lease lost during promotion");
            true
        }
        Err(error) => {
            warn!(identity = %registration.identity(), error = %error, "promotion failed, will retry");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use discover_core::InMemoryBackend;
    use discover_core::RecordState;
    use discover_core::RegistryBackend;

    use super::*;
    use crate::config::LeaseConfig;
    use crate::test_support::CountingBackend;

    fn identity(port: u16) -> ServiceIdentity {
        ServiceIdentity::new("foo", "127.0.0.1", port)
    }

    fn coordinator(backend: Arc<InMemoryBackend>) -> (Arc<LeaseManager>, ElectionCoordinator) {
        let leases = Arc::new(LeaseManager::new(backend, LeaseConfig::default()).unwrap());
        let election = ElectionCoordinator::new(leases.clone(), ElectionConfig::default()).unwrap();
        (leases, election)
    }

    #[tokio::test(start_paused = true)]
    async fn lone_standby_is_elected() {
        let backend = InMemoryBackend::new();
        let (_leases, election) = coordinator(backend.clone());

        let standby = election.register_and_standby(identity(1111), Attributes::new()).await.unwrap();

        assert!(standby.wait_elected().await);
        assert!(standby.is_elected());
        assert_eq!(backend.get(&identity(1111)).unwrap().state, RecordState::Elected);
    }

    #[tokio::test(start_paused = true)]
    async fn standby_waits_for_active_to_leave() {
        let backend = InMemoryBackend::new();
        let (leases, election) = coordinator(backend.clone());
        let active = leases.register(identity(1111), Attributes::new()).await.unwrap();

        let standby = election.register_and_standby(identity(2222), Attributes::new()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(standby.state(), RegistrationState::Waiting);
        assert_eq!(backend.get(&identity(2222)).unwrap().state, RecordState::Waiting);

        active.unregister().await.unwrap();
        assert!(standby.wait_elected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn election_is_sticky() {
        let backend = InMemoryBackend::new();
        let (leases, election) = coordinator(backend.clone());
        let standby = election.register_and_standby(identity(1111), Attributes::new()).await.unwrap();
        assert!(standby.wait_elected().await);

        let _active = leases.register(identity(2222), Attributes::new()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(standby.is_elected());
        let visible = backend.list("foo").await.unwrap().iter().filter(|r| r.is_visible()).count();
        assert_eq!(visible, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn earliest_standby_wins() {
        let backend = InMemoryBackend::new();
        let (leases, election) = coordinator(backend.clone());
        let active = leases.register(identity(1111), Attributes::new()).await.unwrap();
        let first = election.register_and_standby(identity(2222), Attributes::new()).await.unwrap();
        let second = election.register_and_standby(identity(3333), Attributes::new()).await.unwrap();

        active.unregister().await.unwrap();
        assert!(first.wait_elected().await);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(first.is_elected());
        assert_eq!(second.state(), RegistrationState::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn next_standby_takes_over_when_winner_leaves() {
        let backend = InMemoryBackend::new();
        let (_leases, election) = coordinator(backend.clone());
        let first = election.register_and_standby(identity(2222), Attributes::new()).await.unwrap();
        assert!(first.wait_elected().await);
        let second = election.register_and_standby(identity(3333), Attributes::new()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(second.state(), RegistrationState::Waiting);

        first.unregister().await.unwrap();

        assert!(second.wait_elected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_standby_is_never_elected() {
        let backend = InMemoryBackend::new();
        let (leases, election) = coordinator(backend.clone());
        let _active = leases.register(identity(1111), Attributes::new()).await.unwrap();
        let standby = election.register_and_standby(identity(2222), Attributes::new()).await.unwrap();

        standby.unregister().await.unwrap();

        assert!(!standby.wait_elected().await);
        assert_eq!(standby.state(), RegistrationState::Unregistered);
        assert!(backend.get(&identity(2222)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn active_identity_cannot_become_standby() {
        let backend = InMemoryBackend::new();
        let (leases, election) = coordinator(backend);
        let _active = leases.register(identity(1111), Attributes::new()).await.unwrap();

        let err = election.register_and_standby(identity(1111), Attributes::new()).await.unwrap_err();
        assert!(matches!(err, DiscoverError::InvalidRegistration { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn standby_expires_when_backend_disappears() {
        let backend = InMemoryBackend::new();
        let (leases, election) = coordinator(backend.clone());
        let _active = leases.register(identity(1111), Attributes::new()).await.unwrap();
        let standby = election.register_and_standby(identity(2222), Attributes::new()).await.unwrap();

        backend.set_available(false);

        assert!(!standby.wait_elected().await);
        assert_eq!(standby.state(), RegistrationState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn unregister_stops_the_election_task() {
        let backend = CountingBackend::new();
        let leases = Arc::new(LeaseManager::new(backend.clone(), LeaseConfig::default()).unwrap());
        let election = ElectionCoordinator::new(leases.clone(), ElectionConfig::default()).unwrap();
        let _active = leases.register(identity(1111), Attributes::new()).await.unwrap();
        let standby = election.register_and_standby(identity(2222), Attributes::new()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(standby.state(), RegistrationState::Waiting);
        assert!(backend.lists() > 0);

        standby.unregister().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Renewal and election tasks have both let go.
        assert_eq!(Arc::strong_count(&standby.registration), 1);
        let lists = backend.lists();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.lists(), lists);
    }
}

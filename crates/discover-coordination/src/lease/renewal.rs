//! Background lease renewal.
//!
//! One task per registration. Each round sleeps for the renew interval,
//! then renews, retrying transient failures with jittered backoff (capped at
//! `renew_max_backoff_ms`) until the next retry would land past the lease
//! deadline. `renew_max_attempts` is only a hard cap on top of that.
//!
//! # Tiger Style
//!
//! - Exactly one task per registration, stopped through its CancellationToken
//! - Retries bounded by the lease deadline and a hard attempt cap
//! - No lock held across an await

use std::sync::Arc;
use std::time::Duration;

use discover_core::BackendError;
use tokio::time::Instant;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::registration::Registration;
use crate::pure::compute_backoff_with_jitter;
use crate::pure::effective_renew_interval_ms;
use crate::pure::should_abandon_renewal;

enum RoundOutcome {
    Renewed,
    Cancelled,
    Lost(&'static str),
}

/// Spawn the renewal task for an acknowledged registration.
pub(crate) fn spawn_renewal(registration: Arc<Registration>) {
    tokio::spawn(renewal_task(registration));
}

async fn renewal_task(registration: Arc<Registration>) {
    let config = registration.config();
    let interval = Duration::from_millis(effective_renew_interval_ms(config.ttl_ms, config.renew_interval_ms));
    let cancel = registration.cancel_token();

    debug!(identity = %registration.identity(), interval_ms = interval.as_millis() as u64, "lease renewal started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        match renew_round(&registration).await {
            RoundOutcome::Renewed => {}
            RoundOutcome::Cancelled => break,
            RoundOutcome::Lost(reason) => {
                registration.expire(reason);
                break;
            }
        }
    }

    debug!(identity = %registration.identity(), state = %registration.state(), "lease renewal stopped");
}

async fn renew_round(registration: &Registration) -> RoundOutcome {
    let config = registration.config();
    let cancel = registration.cancel_token();
    let mut backoff_ms = config.renew_initial_backoff_ms;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let Some(token) = registration.token() else {
            return RoundOutcome::Lost("no lease token");
        };
        let sent_at = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RoundOutcome::Cancelled,
            result = registration.client().renew_once(&token) => result,
        };

        let error = match result {
            Ok(lease_expiry_ms) => {
                registration.record_renewal(lease_expiry_ms, sent_at);
                trace!(identity = %registration.identity(), lease_expiry_ms, attempt, "lease renewed");
                return RoundOutcome::Renewed;
            }
            // An update may have replaced the lease while this call was in flight.
            Err(BackendError::LeaseLost { .. }) if registration.token().as_ref() != Some(&token) => continue,
            Err(BackendError::LeaseLost { .. }) => return RoundOutcome::Lost("lease lost"),
            Err(error) if !error.is_transient() => return RoundOutcome::Lost("renewal rejected"),
            Err(error) => error,
        };

        let step = compute_backoff_with_jitter(backoff_ms, config.renew_max_backoff_ms, rand::random::<u64>());
        let remaining_ms = registration.remaining_lease().as_millis() as u64;
        if should_abandon_renewal(attempt, config.renew_max_attempts, remaining_ms, step.sleep_ms) {
            warn!(
                identity = %registration.identity(),
                attempt,
                remaining_ms,
                error = %error,
                "lease renewal abandoned before the lease lapses"
            );
            return RoundOutcome::Lost("renewal abandoned");
        }

        warn!(
            identity = %registration.identity(),
            attempt,
            remaining_ms,
            retry_in_ms = step.sleep_ms,
            error = %error,
            "lease renewal failed, retrying"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return RoundOutcome::Cancelled,
            _ = tokio::time::sleep(Duration::from_millis(step.sleep_ms)) => {}
        }
        backoff_ms = step.next_backoff_ms;
    }
}

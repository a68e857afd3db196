//! Last-one-standing election decisions.
//!
//! A standby is elected once no other registration for its service name is
//! visible (active or already elected). When several standbys are waiting at
//! that moment, the one the backend created first (lowest sequence) wins and
//! the rest keep waiting; the winner's promotion then makes it visible, which
//! in turn keeps every other standby waiting.

use discover_core::RecordState;
use discover_core::RegistrationRecord;
use discover_core::ServiceIdentity;

/// What a waiting standby should do after looking at the current records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionDecision {
    /// Promote self.
    Elect,
    /// Other registrations are visible.
    Wait {
        /// Number of visible competitors.
        competitors: u32,
    },
    /// Nothing is visible but an earlier standby has priority.
    Defer {
        /// Sequence of the standby that goes first.
        leader_sequence: u64,
    },
    /// Own record is missing or lapsed; the lease loop will notice.
    Absent,
}

/// Count visible registrations other than `own`.
pub fn count_competitors(own: &ServiceIdentity, records: &[RegistrationRecord]) -> u32 {
    let count = records.iter().filter(|r| r.identity != *own && r.is_visible()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Decide the next election step for `own`.
///
/// # Arguments
///
/// * `own` - Identity of the deciding standby
/// * `records` - Current backend records for the service name
pub fn decide_election(own: &ServiceIdentity, records: &[RegistrationRecord]) -> ElectionDecision {
    let Some(own_record) = records.iter().find(|r| r.identity == *own) else {
        return ElectionDecision::Absent;
    };
    match own_record.state {
        RecordState::Elected => return ElectionDecision::Elect,
        RecordState::Expired => return ElectionDecision::Absent,
        RecordState::Active | RecordState::Waiting => {}
    }

    let competitors = count_competitors(own, records);
    if competitors > 0 {
        return ElectionDecision::Wait { competitors };
    }

    let earliest_waiting = records
        .iter()
        .filter(|r| r.identity != *own && r.state == RecordState::Waiting)
        .map(|r| r.sequence)
        .min();
    match earliest_waiting {
        Some(leader_sequence) if leader_sequence < own_record.sequence => ElectionDecision::Defer { leader_sequence },
        _ => ElectionDecision::Elect,
    }
}

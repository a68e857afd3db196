//! Property tests for discovery filtering and election decisions.

use discover::Attributes;
use discover::RecordState;
use discover::RegistrationMode;
use discover::RegistrationRecord;
use discover::ServiceFilter;
use discover::ServiceIdentity;
use discover_coordination::pure::ElectionDecision;
use discover_coordination::pure::decide_election;
use proptest::prelude::*;

fn attribute_map() -> impl Strategy<Value = Attributes> {
    proptest::collection::btree_map("[a-c]{1,2}", "[x-z]{0,2}", 0..6)
}

fn record_state() -> impl Strategy<Value = RecordState> {
    prop_oneof![
        Just(RecordState::Active),
        Just(RecordState::Waiting),
        Just(RecordState::Elected),
        Just(RecordState::Expired),
    ]
}

proptest! {
    #[test]
    fn filter_match_is_subset_check(instance in attribute_map(), filter in attribute_map()) {
        let expected = filter.iter().all(|(k, v)| instance.get(k) == Some(v));
        let filter = ServiceFilter::new(filter).unwrap();
        prop_assert_eq!(filter.matches(&instance), expected);
    }

    #[test]
    fn merged_filters_are_at_least_as_strict(instance in attribute_map(), a in attribute_map(), b in attribute_map()) {
        let mut merged = a.clone();
        merged.extend(b);
        let merged = ServiceFilter::new(merged).unwrap();
        let a = ServiceFilter::new(a).unwrap();
        if merged.matches(&instance) {
            prop_assert!(a.matches(&instance));
        }
    }

    #[test]
    fn at_most_one_waiting_standby_is_told_to_elect(
        states in proptest::collection::vec(record_state(), 1..8),
    ) {
        let records: Vec<RegistrationRecord> = states
            .iter()
            .enumerate()
            .map(|(i, state)| RegistrationRecord {
                identity: ServiceIdentity::new("foo", "127.0.0.1", 1000 + i as u16),
                mode: match state {
                    RecordState::Active => RegistrationMode::Active,
                    _ => RegistrationMode::Standby,
                },
                attributes: Attributes::new(),
                state: *state,
                version: 1,
                sequence: i as u64 + 1,
                lease_expiry_ms: 10_000,
            })
            .collect();

        let electing = records
            .iter()
            .filter(|r| r.state == RecordState::Waiting)
            .filter(|r| decide_election(&r.identity, &records) == ElectionDecision::Elect)
            .count();
        prop_assert!(electing <= 1);

        let any_visible = records.iter().any(|r| r.is_visible());
        let any_waiting = records.iter().any(|r| r.state == RecordState::Waiting);
        if !any_visible && any_waiting {
            prop_assert_eq!(electing, 1);
        }
    }
}

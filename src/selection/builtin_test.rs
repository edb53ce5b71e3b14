// ABOUTME: Tests for the built-in selection policies.
// ABOUTME: Verifies firing thresholds, pairing by property, and policy descriptions.

use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::replica::{Replica, ReplicaId};

fn ensemble(n: u32) -> Vec<Arc<Replica>> {
    (0..n).map(|i| Arc::new(Replica::new(i))).collect()
}

fn ladder(temperatures: &[f64]) -> Vec<Arc<Replica>> {
    temperatures
        .iter()
        .enumerate()
        .map(|(i, t)| Arc::new(Replica::new(i as u32).with_property("temperature", *t)))
        .collect()
}

#[test]
fn test_group_size_waits_below_threshold() {
    let policy = GroupSizePolicy::new(3);
    let waitlist = ensemble(2);
    assert!(!policy.select(&waitlist, &json!(null)).is_exchange());
}

#[test]
fn test_group_size_takes_whole_waitlist() {
    let policy = GroupSizePolicy::new(2);
    let waitlist = ensemble(2);

    match policy.select(&waitlist, &json!(null)) {
        Selection::Exchange(partition) => {
            assert_eq!(partition.exchange_ids(), vec![ReplicaId(0), ReplicaId(1)]);
            assert!(partition.remaining.is_empty());
            assert_eq!(partition.validate(&waitlist, ReplicaId(1)), Ok(()));
        }
        Selection::NotYet => panic!("Expected an exchange"),
    }
}

#[test]
fn test_group_size_description() {
    let description = GroupSizePolicy::new(4).describe();
    assert_eq!(description.policy, "group_size");
    assert_eq!(description.parameters, json!({"exchange_size": 4}));
}

#[test]
fn test_nearest_property_pairs_closest_neighbor() {
    let policy = NearestPropertyPolicy::new("temperature");
    // Newest arrival (310) is closest to 300.
    let waitlist = ladder(&[300.0, 350.0, 400.0, 310.0]);

    match policy.select(&waitlist, &json!({})) {
        Selection::Exchange(partition) => {
            assert_eq!(partition.exchange_ids(), vec![ReplicaId(0), ReplicaId(3)]);
            assert_eq!(partition.remaining_ids(), vec![ReplicaId(1), ReplicaId(2)]);
            assert_eq!(partition.validate(&waitlist, ReplicaId(3)), Ok(()));
        }
        Selection::NotYet => panic!("Expected an exchange"),
    }
}

#[test]
fn test_nearest_property_alone_waits() {
    let policy = NearestPropertyPolicy::new("temperature");
    let waitlist = ladder(&[300.0]);
    assert!(!policy.select(&waitlist, &json!({})).is_exchange());
}

#[test]
fn test_nearest_property_respects_gap() {
    let policy = NearestPropertyPolicy::new("temperature").max_gap(5.0);
    let waitlist = ladder(&[300.0, 320.0]);
    assert!(!policy.select(&waitlist, &json!({})).is_exchange());

    // Criteria override the configured gap.
    assert!(policy.select(&waitlist, &json!({"max_gap": 25.0})).is_exchange());
}

#[test]
fn test_nearest_property_skips_replicas_without_value() {
    let policy = NearestPropertyPolicy::new("temperature");
    let waitlist = vec![
        Arc::new(Replica::new(0)),
        Arc::new(Replica::new(1).with_property("temperature", 300.0)),
    ];
    assert!(!policy.select(&waitlist, &json!({})).is_exchange());
}

#[test]
fn test_nearest_property_description_round_trips() {
    let policy = NearestPropertyPolicy::new("temperature").max_gap(12.5);
    let description = policy.describe();
    assert_eq!(description.policy, "nearest_property");

    let restored: NearestPropertyPolicy =
        serde_json::from_value(description.parameters).unwrap();
    assert_eq!(restored, policy);
}

//! Tests for the node table

use super::*;
use crate::domain::{IpAddr, Node, NodeId, TableConfig};

fn make_node_id(first: u8, second: u8) -> NodeId {
    let mut bytes = [0u8; 32];
    bytes[0] = first;
    bytes[1] = second;
    NodeId::new(bytes)
}

fn make_node(first: u8, second: u8) -> Node {
    Node::new(make_node_id(first, second), IpAddr::v4(10, first, second, 1), 8483, 8483)
}

fn table() -> NodeBuckets {
    NodeBuckets::new(NodeId::zero(), TableConfig::for_testing())
}

#[test]
fn test_insert_and_contains() {
    let mut table = table();
    assert!(table.is_empty());

    assert_eq!(table.insert(make_node(0x80, 0)), InsertOutcome::Inserted);
    assert!(table.contains(&make_node_id(0x80, 0)));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_self_never_inserted() {
    let mut table = table();
    let me = Node::new(NodeId::zero(), IpAddr::v4(127, 0, 0, 1), 1, 1);
    assert_eq!(table.insert(me), InsertOutcome::IsSelf);
    assert!(table.is_empty());
}

#[test]
fn test_reinsert_replaces_record() {
    let mut table = table();
    table.insert(make_node(0x80, 0));

    let moved = Node::new(make_node_id(0x80, 0), IpAddr::v4(192, 168, 0, 9), 9000, 9001);
    assert_eq!(table.insert(moved.clone()), InsertOutcome::Updated);
    assert_eq!(table.len(), 1);
    assert_eq!(table.closest(&NodeId::zero(), 1), vec![moved]);
}

#[test]
fn test_reinsert_same_record_is_refresh() {
    let mut table = table();
    let known = make_node(0x80, 0).with_ext(vec![7; 96]);
    table.insert(known.clone());

    assert_eq!(table.insert(known.clone()), InsertOutcome::Refreshed);
    assert!(!InsertOutcome::Refreshed.is_change());
}

#[test]
fn test_reinsert_without_ext_keeps_stored_ext() {
    let mut table = table();
    let known = make_node(0x80, 0).with_ext(vec![7; 96]);
    table.insert(known.clone());

    // A bare endpoint record does not strip the ownership proof
    assert_eq!(table.insert(make_node(0x80, 0)), InsertOutcome::Refreshed);
    assert_eq!(table.closest(&NodeId::zero(), 1), vec![known.clone()]);

    let announced = make_node(0x80, 0).with_ext(vec![8; 96]);
    assert_eq!(table.insert(announced.clone()), InsertOutcome::Updated);
    assert!(InsertOutcome::Updated.is_change());
    assert_eq!(table.closest(&NodeId::zero(), 1), vec![announced]);
}

#[test]
fn test_full_bucket_drops_newcomer() {
    let mut table = table();
    // Same first byte 0x80 → same bucket 0 relative to the zero id
    for second in 0..3 {
        assert_eq!(table.insert(make_node(0x80, second)), InsertOutcome::Inserted);
    }
    assert_eq!(table.insert(make_node(0x80, 99)), InsertOutcome::BucketFull);
    assert!(!table.contains(&make_node_id(0x80, 99)));
    assert_eq!(table.len(), 3);
}

#[test]
fn test_remove() {
    let mut table = table();
    table.insert(make_node(0x40, 0));
    assert!(table.remove(&make_node_id(0x40, 0)).is_some());
    assert!(table.remove(&make_node_id(0x40, 0)).is_none());
    assert!(table.is_empty());
}

#[test]
fn test_closest_spans_buckets() {
    let mut table = table();
    for first in [0x80, 0x40, 0x20, 0x10, 0x08] {
        table.insert(make_node(first, 0));
    }

    let target = make_node_id(0x21, 0);
    let closest = table.closest(&target, 2);
    assert_eq!(closest[0].id, make_node_id(0x20, 0));
    assert_eq!(closest.len(), 2);
}

#[test]
fn test_random_is_bounded_and_distinct() {
    let mut table = table();
    for first in 1..=6 {
        table.insert(make_node(first << 1, 0));
    }

    let sample = table.random(4);
    assert_eq!(sample.len(), 4);
    let mut ids: Vec<_> = sample.iter().map(|n| n.id.as_bytes()[0]).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    assert_eq!(table.random(100).len(), 6);
}

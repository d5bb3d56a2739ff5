//! Tests for distance and sorting services

use super::*;
use crate::domain::{IpAddr, Node, NodeId};

fn make_node_id(first: u8) -> NodeId {
    let mut bytes = [0u8; 32];
    bytes[0] = first;
    NodeId::new(bytes)
}

fn make_node(first: u8) -> Node {
    Node::new(make_node_id(first), IpAddr::v4(10, 0, 0, first), 8483, 8483)
}

#[test]
fn test_xor_distance_symmetric() {
    let a = make_node_id(0b1010_0000);
    let b = make_node_id(0b0010_0000);
    assert_eq!(xor_distance(&a, &b), xor_distance(&b, &a));
}

#[test]
fn test_xor_distance_first_differing_bit() {
    let zero = NodeId::zero();
    assert_eq!(xor_distance(&zero, &make_node_id(0x80)).bucket_index(), 0);
    assert_eq!(xor_distance(&zero, &make_node_id(0x01)).bucket_index(), 7);

    let mut bytes = [0u8; 32];
    bytes[1] = 0x40;
    assert_eq!(xor_distance(&zero, &NodeId::new(bytes)).bucket_index(), 9);
}

#[test]
fn test_self_distance_is_closest_bucket() {
    let a = make_node_id(42);
    assert_eq!(bucket_for_node(&a, &a), 255);
}

#[test]
fn test_find_k_closest_orders_by_xor() {
    let nodes = vec![make_node(0x80), make_node(0x01), make_node(0x10), make_node(0x03)];
    let target = NodeId::zero();

    let closest = find_k_closest(&nodes, &target, 3);
    let firsts: Vec<u8> = closest.iter().map(|n| n.id.as_bytes()[0]).collect();
    assert_eq!(firsts, vec![0x01, 0x03, 0x10]);
}

#[test]
fn test_find_k_closest_with_fewer_nodes_than_k() {
    let nodes = vec![make_node(5)];
    assert_eq!(find_k_closest(&nodes, &NodeId::zero(), 10).len(), 1);
    assert!(find_k_closest(&Vec::<Node>::new(), &NodeId::zero(), 10).is_empty());
}

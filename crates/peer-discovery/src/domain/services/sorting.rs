//! Node sorting and selection.

use std::cmp::Ordering;

use crate::domain::{Node, NodeId};

/// Compare full XOR distances to `target`; smaller XOR sorts first.
fn cmp_by_xor(a: &NodeId, b: &NodeId, target: &NodeId) -> Ordering {
    let ta = target.as_bytes();
    for i in 0..32 {
        let da = a.as_bytes()[i] ^ ta[i];
        let db = b.as_bytes()[i] ^ ta[i];
        if da != db {
            return da.cmp(&db);
        }
    }
    Ordering::Equal
}

/// Sort nodes by XOR distance from a target (closest first).
pub fn sort_nodes_by_distance(nodes: &mut [Node], target: &NodeId) {
    nodes.sort_by(|a, b| cmp_by_xor(&a.id, &b.id, target));
}

/// Find the k closest nodes to a target from a list
///
/// # Returns
/// Up to k nodes sorted by distance (closest first)
pub fn find_k_closest<'a, I>(nodes: I, target: &NodeId, k: usize) -> Vec<Node>
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut all: Vec<Node> = nodes.into_iter().cloned().collect();
    sort_nodes_by_distance(&mut all, target);
    all.truncate(k);
    all
}

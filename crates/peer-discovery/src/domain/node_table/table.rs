//! Main table implementation.

use rand::seq::SliceRandom;

use super::bucket::{InsertOutcome, KBucket};
use crate::domain::{bucket_for_node, find_k_closest, Node, NodeId, TableConfig};

/// Number of buckets (one per bit of a NodeId).
pub const NUM_BUCKETS: usize = 256;

/// Kademlia bucket set owned by one local node.
#[derive(Debug)]
pub struct NodeBuckets {
    /// Our own node ID (immutable after creation)
    local_id: NodeId,
    /// 256 k-buckets, one for each possible XOR distance
    buckets: Vec<KBucket>,
    config: TableConfig,
}

impl NodeBuckets {
    /// Create an empty table
    pub fn new(local_id: NodeId, config: TableConfig) -> Self {
        Self {
            local_id,
            buckets: (0..NUM_BUCKETS).map(|_| KBucket::new()).collect(),
            config,
        }
    }

    /// Get our local node ID
    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Get the configuration
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Total node count across all buckets
    pub fn len(&self) -> usize {
        self.buckets.iter().map(KBucket::len).sum()
    }

    /// True when no node is known
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(KBucket::is_empty)
    }

    /// Insert a node, or replace the stored record for its id.
    pub fn insert(&mut self, node: Node) -> InsertOutcome {
        if node.id == self.local_id {
            return InsertOutcome::IsSelf;
        }
        let index = bucket_for_node(&self.local_id, &node.id);
        self.buckets[index].upsert(node, self.config.k)
    }

    /// Remove a node.
    pub fn remove(&mut self, id: &NodeId) -> Option<Node> {
        let index = bucket_for_node(&self.local_id, id);
        self.buckets[index].remove(id)
    }

    /// Check membership.
    pub fn contains(&self, id: &NodeId) -> bool {
        let index = bucket_for_node(&self.local_id, id);
        self.buckets[index].contains(id)
    }

    /// Up to `k` nodes closest to `target`, closest first.
    pub fn closest(&self, target: &NodeId, k: usize) -> Vec<Node> {
        find_k_closest(self.buckets.iter().flat_map(|b| b.nodes()), target, k)
    }

    /// Up to `n` nodes sampled uniformly without replacement.
    pub fn random(&self, n: usize) -> Vec<Node> {
        let all: Vec<&Node> = self.buckets.iter().flat_map(|b| b.nodes()).collect();
        all.choose_multiple(&mut rand::thread_rng(), n)
            .map(|node| (*node).clone())
            .collect()
    }
}

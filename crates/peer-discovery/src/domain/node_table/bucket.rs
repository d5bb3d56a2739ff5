//! K-Bucket implementation for Kademlia routing.

use crate::domain::{Node, NodeId};

/// What happened to a node offered to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Node was new and has been appended
    Inserted,
    /// Node was known with a different record; it was replaced and moved to the tail
    Updated,
    /// Node was known with the same record; it was moved to the tail
    Refreshed,
    /// Bucket is at capacity; the newcomer was dropped
    BucketFull,
    /// Node is the local node
    IsSelf,
}

impl InsertOutcome {
    /// Whether the table now holds a record it did not hold before.
    pub fn is_change(self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// A k-bucket storing up to k nodes at one distance range.
///
/// Nodes are ordered least-recently-seen first. A full bucket keeps its
/// existing, long-lived entries and drops newcomers.
#[derive(Debug, Clone, Default)]
pub struct KBucket {
    pub(crate) nodes: Vec<Node>,
}

impl KBucket {
    /// Create a new empty k-bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of nodes in this bucket
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get all nodes in this bucket
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Insert or refresh a node.
    ///
    /// A record without ext keeps the ext already stored for that id.
    pub(crate) fn upsert(&mut self, mut node: Node, k: usize) -> InsertOutcome {
        if let Some(pos) = self.nodes.iter().position(|n| n.id == node.id) {
            let known = self.nodes.remove(pos);
            if node.ext.is_empty() {
                node.ext = known.ext.clone();
            }
            let outcome = if known == node {
                InsertOutcome::Refreshed
            } else {
                InsertOutcome::Updated
            };
            self.nodes.push(node);
            return outcome;
        }

        if self.nodes.len() >= k {
            return InsertOutcome::BucketFull;
        }

        self.nodes.push(node);
        InsertOutcome::Inserted
    }

    /// Remove a node by NodeId.
    pub(crate) fn remove(&mut self, id: &NodeId) -> Option<Node> {
        self.nodes
            .iter()
            .position(|n| &n.id == id)
            .map(|pos| self.nodes.remove(pos))
    }

    /// Check if bucket contains a node
    pub(crate) fn contains(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }
}

use parking_lot::RwLock;

use crate::domain::{InsertOutcome, Node, NodeBuckets, NodeId, TableConfig};
use crate::ports::NodeTable;

/// Thread-safe [`NodeTable`] over [`NodeBuckets`].
#[derive(Debug)]
pub struct KademliaTable {
    inner: RwLock<NodeBuckets>,
}

impl KademliaTable {
    /// Empty table around `local_id`.
    pub fn new(local_id: NodeId, config: TableConfig) -> Self {
        Self {
            inner: RwLock::new(NodeBuckets::new(local_id, config)),
        }
    }

    /// Forget a node.
    pub fn remove(&self, id: &NodeId) -> Option<Node> {
        self.inner.write().remove(id)
    }

    /// Check membership.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.inner.read().contains(id)
    }
}

impl NodeTable for KademliaTable {
    fn insert(&self, node: Node) -> InsertOutcome {
        self.inner.write().insert(node)
    }

    fn closest_to(&self, target: &NodeId, k: usize) -> Vec<Node> {
        self.inner.read().closest(target, k)
    }

    fn resolve(&self, n: usize) -> Vec<Node> {
        self.inner.read().random(n)
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IpAddr;

    fn node(byte: u8) -> Node {
        Node::new(NodeId::new([byte; 32]), IpAddr::v4(10, 0, 0, byte), 1, 1)
    }

    #[test]
    fn test_insert_reports_outcome() {
        let table = KademliaTable::new(NodeId::zero(), TableConfig::default());
        assert_eq!(table.insert(node(1)), InsertOutcome::Inserted);
        assert_eq!(table.insert(node(1)), InsertOutcome::Refreshed);
        assert_eq!(table.insert(node(1).with_ext(vec![1])), InsertOutcome::Updated);
        assert_eq!(
            table.insert(Node::new(NodeId::zero(), IpAddr::v4(1, 1, 1, 1), 1, 1)),
            InsertOutcome::IsSelf
        );
        assert_eq!(table.len(), 1);
        assert!(table.contains(&NodeId::new([1; 32])));
    }

    #[test]
    fn test_closest_and_resolve() {
        let table = KademliaTable::new(NodeId::zero(), TableConfig::default());
        for byte in [0x80, 0x40, 0x01] {
            table.insert(node(byte));
        }

        let closest = table.closest_to(&NodeId::new([0x01; 32]), 2);
        assert_eq!(closest[0].id, NodeId::new([0x01; 32]));
        assert_eq!(closest.len(), 2);

        assert_eq!(table.resolve(10).len(), 3);
        assert_eq!(table.resolve(2).len(), 2);

        assert!(table.remove(&NodeId::new([0x40; 32])).is_some());
        assert_eq!(table.len(), 2);
    }
}

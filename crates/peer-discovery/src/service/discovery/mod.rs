//! # Discovery Service
//!
//! Owns the local identity and the node table. Inbound packets are parsed by
//! the wire codec and dispatched through [`Message::handle`]; replies to our
//! own requests are routed to the waiting caller by the correlator.
//!
//! ```text
//! UDP ──→ wire::parse ──→ Message::handle ──┬─→ NodeTable (Ping)
//!                                          ├─→ reply (Ping, FindNode)
//!                                          └─→ Correlator (Pong, Neighbors)
//! ```
//!
//! Nodes that enter the table for the first time are published to every
//! [`NodeFeed`] subscriber.
//!
//! [`Message::handle`]: crate::wire::Message::handle

mod handle;
mod requests;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use shared_crypto::Ed25519KeyPair;
use thiserror::Error;

use super::correlator::Correlator;
use crate::domain::{DiscoveryConfig, InsertOutcome, Node, NodeId};
use crate::ports::{
    NetworkError, NodeCallback, NodeFeed, NodeResolver, NodeTable, PacketSender,
};
use crate::wire::WireError;

/// Errors from discovery requests and packet handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Packet could not be composed or parsed
    #[error(transparent)]
    Wire(#[from] WireError),
    /// Datagram could not be sent
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// No matching reply within the request timeout
    #[error("no reply from {0} within the request timeout")]
    Timeout(NodeId),
}

/// The discovery service.
pub struct Discovery {
    key: Ed25519KeyPair,
    self_node: Node,
    table: Arc<dyn NodeTable>,
    sender: Arc<dyn PacketSender>,
    config: DiscoveryConfig,
    bootstrap_nodes: Vec<Node>,
    pub(crate) correlator: Correlator,
    subscribers: RwLock<HashMap<u64, NodeCallback>>,
    next_subscriber: AtomicU64,
}

impl Discovery {
    /// Create the service.
    ///
    /// `self_node` is what we advertise; its `ext` travels in our Pings.
    pub fn new(
        key: Ed25519KeyPair,
        self_node: Node,
        table: Arc<dyn NodeTable>,
        sender: Arc<dyn PacketSender>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            key,
            self_node,
            table,
            sender,
            config,
            bootstrap_nodes: Vec::new(),
            correlator: Correlator::default(),
            subscribers: RwLock::new(HashMap::new()),
            next_subscriber: AtomicU64::new(0),
        }
    }

    /// Nodes pinged when the table is empty.
    #[must_use]
    pub fn with_bootstrap_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.bootstrap_nodes = nodes;
        self
    }

    /// Our node id.
    pub fn id(&self) -> NodeId {
        self.self_node.id
    }

    /// The node we advertise.
    pub fn self_node(&self) -> &Node {
        &self.self_node
    }

    /// Backing node table.
    pub fn table(&self) -> &Arc<dyn NodeTable> {
        &self.table
    }

    /// Insert `node`, publishing it if the table did not hold this record
    /// yet. A known node re-announcing a new ext or endpoint is published
    /// again.
    pub(crate) fn learn(&self, node: Node) -> InsertOutcome {
        if node.id == self.self_node.id {
            return InsertOutcome::IsSelf;
        }
        let outcome = self.table.insert(node.clone());
        if outcome.is_change() {
            self.publish(node);
        }
        outcome
    }

    fn publish(&self, node: Node) {
        let callbacks: Vec<NodeCallback> = self.subscribers.read().values().cloned().collect();
        for callback in callbacks {
            callback(node.clone());
        }
    }
}

impl NodeFeed for Discovery {
    fn subscribe(&self, callback: NodeCallback) -> u64 {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().insert(id, callback);
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.write().remove(&id);
    }
}

impl NodeResolver for Discovery {
    fn get_nodes(&self, n: usize) -> Vec<Node> {
        self.table.resolve(n)
    }
}

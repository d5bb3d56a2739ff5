//! # Driving Ports (Inbound API)
//!
//! Interfaces the discovery service exposes. The finder consumes both: it
//! subscribes to the feed to learn validator nodes and asks the resolver for
//! fresh candidates when it is under its peer ceiling.

use std::sync::Arc;

use crate::domain::Node;

/// Callback invoked with every newly discovered node.
pub type NodeCallback = Arc<dyn Fn(Node) + Send + Sync>;

/// Stream of discovered nodes.
///
/// Callbacks run on the discovering task and must not block.
pub trait NodeFeed: Send + Sync {
    /// Register `callback`; returns the subscription id.
    fn subscribe(&self, callback: NodeCallback) -> u64;

    /// Drop a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: u64);
}

/// Source of connection candidates.
pub trait NodeResolver: Send + Sync {
    /// Up to `n` known nodes, in no particular order.
    fn get_nodes(&self, n: usize) -> Vec<Node>;
}

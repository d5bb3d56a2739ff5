//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces this subsystem **requires** the host application
//! to implement.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Address, InsertOutcome, Node, NodeId, Timestamp};

// =============================================================================
// CONSENSUS
// =============================================================================

/// Consensus group whose producers the finder follows.
pub const SNAPSHOT_GROUP: &str = "snapshot";

/// The producer set of the next round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducersEvent {
    /// Addresses elected to produce
    pub addrs: Vec<Address>,
}

/// Callback invoked on every producer-set change.
pub type ProducersCallback = Arc<dyn Fn(ProducersEvent) + Send + Sync>;

/// Errors from the consensus collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// Consensus has not finished initialising
    #[error("consensus not ready")]
    NotReady,
    /// The vote map could not be read
    #[error("cannot read producers: {0}")]
    Read(String),
}

/// Election state of the block producers.
///
/// Subscriptions are keyed by `(group, name)`; subscribing twice under the
/// same key replaces the earlier callback.
pub trait ProducerSource: Send + Sync {
    /// Producers elected at `now`.
    fn read_current_producers(&self, now: Timestamp) -> Result<Vec<Address>, ConsensusError>;

    /// Register `callback` for producer changes in `group`.
    fn subscribe_producers(&self, group: &str, name: &str, callback: ProducersCallback);

    /// Remove the subscription registered under `(group, name)`.
    fn unsubscribe_producers(&self, group: &str, name: &str);
}

// =============================================================================
// PEERS & CONNECTIONS
// =============================================================================

/// A connected session.
pub trait Peer: Send + Sync {
    /// Remote node id.
    fn id(&self) -> NodeId;

    /// Flag the session as belonging to an elected producer.
    fn set_superior(&self, superior: bool);
}

/// The set of connected sessions.
pub trait PeerSet: Send + Sync {
    /// Connected peers that are not flagged superior.
    fn count_excluding_sbp(&self) -> usize;

    /// Session with `id`, if connected.
    fn lookup(&self, id: &NodeId) -> Option<Arc<dyn Peer>>;
}

/// Errors from an outbound connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Already connected to this node
    #[error("already connected")]
    AlreadyConnected,
    /// Nothing answered in time
    #[error("connection timed out")]
    Timeout,
    /// Transport failure
    #[error("connection failed: {0}")]
    Io(String),
    /// Remote end rejected the session
    #[error("handshake rejected: {0}")]
    Rejected(String),
}

/// Establishes outbound sessions.
///
/// Implementations apply their own timeout; the finder never cancels an
/// attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `node`. On success the session joins the peer set.
    async fn connect_node(&self, node: &Node) -> Result<(), ConnectError>;
}

// =============================================================================
// NODE TABLE
// =============================================================================

/// Storage of known nodes.
pub trait NodeTable: Send + Sync {
    /// Insert or refresh `node`, reporting whether its record is new,
    /// changed or already known.
    fn insert(&self, node: Node) -> InsertOutcome;

    /// Up to `k` nodes sorted by XOR distance to `target`.
    fn closest_to(&self, target: &NodeId, k: usize) -> Vec<Node>;

    /// Up to `n` random nodes.
    fn resolve(&self, n: usize) -> Vec<Node>;

    /// Number of stored nodes.
    fn len(&self) -> usize;

    /// Whether the table is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TRANSPORT & TIME
// =============================================================================

/// Errors from network operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Socket send buffer is full
    #[error("socket would block")]
    WouldBlock,
    /// Invalid destination address
    #[error("invalid socket address")]
    InvalidAddress,
    /// Datagram exceeds the maximum size
    #[error("message exceeds maximum size")]
    MessageTooLarge,
    /// Any other socket failure
    #[error("socket error: {0}")]
    Io(String),
}

/// Sends raw datagrams.
///
/// Sends never wait: a full socket buffer is reported as `WouldBlock` and the
/// packet is dropped.
pub trait PacketSender: Send + Sync {
    /// Send `packet` to `to`.
    fn send_packet(&self, to: SocketAddr, packet: &[u8]) -> Result<(), NetworkError>;
}

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTimeSource(u64);

    impl TimeSource for FixedTimeSource {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0)
        }
    }

    #[test]
    fn test_fixed_time_source_returns_configured_value() {
        let source = FixedTimeSource(1000);
        assert_eq!(source.now().as_secs(), 1000);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(NetworkError::WouldBlock.to_string(), "socket would block");
        assert_eq!(
            ConnectError::Io("refused".into()).to_string(),
            "connection failed: refused"
        );
        assert_eq!(ConsensusError::NotReady.to_string(), "consensus not ready");
    }
}

//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** what the discovery service offers to the
//!   rest of the node (discovered-node feed, candidate resolver)
//! - **Driven Ports (Outbound):** what the finder and the discovery service
//!   require from their host (consensus, peer set, connector, node table,
//!   packet transport, clock)

pub mod inbound;
pub mod outbound;

pub use inbound::{NodeCallback, NodeFeed, NodeResolver};
pub use outbound::{
    ConnectError, ConsensusError, Connector, NetworkError, NodeTable, PacketSender, Peer, PeerSet,
    ProducerSource, ProducersCallback, ProducersEvent, TimeSource, SNAPSHOT_GROUP,
};

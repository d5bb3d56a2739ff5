//! # SBP-aware Peer Discovery & Connection Admission
//!
//! Finds peers over an authenticated UDP protocol and decides which of them
//! to connect to under a peer budget, meshing first with the nodes of the
//! currently elected super block producers (SBPs).
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** node records, ownership proofs, descriptors,
//!   XOR distance and k-buckets
//! - **Wire:** the signed packet envelope and the four discovery messages
//! - **Ports Layer:** traits for consensus, sessions, transport and storage
//! - **Service Layer:** the discovery service and the finder
//! - **Adapters Layer:** in-memory table and registries, UDP / TCP / TOML
//!   (network adapters behind the `network` feature)
//!
//! ## Example
//!
//! ```rust
//! use peer_discovery::wire::{self, Message, Ping};
//! use peer_discovery::NodeId;
//! use shared_crypto::Ed25519KeyPair;
//!
//! let key = Ed25519KeyPair::from_seed([1u8; 32]);
//! let ping = Message::Ping(Ping {
//!     id: NodeId::from_public_key(&key.public_key()),
//!     ext: vec![],
//! });
//!
//! let (packet, hash) = ping.pack(&key).unwrap();
//! let (decoded, parsed_hash) = wire::parse(&packet).unwrap();
//! assert_eq!(decoded, ping);
//! assert_eq!(parsed_hash, hash);
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod wire;

/// Mock ports and fixtures.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Domain
pub use domain::{
    parse_node, parse_node_ext, set_node_ext, Address, DescriptorError, DiscoveryConfig,
    FinderConfig, FinderError, IpAddr, Node, NodeId, TableConfig, Timestamp, EXT_LEN,
};

// Ports
pub use ports::{
    ConnectError, ConsensusError, Connector, NetworkError, NodeFeed, NodeResolver, NodeTable,
    PacketSender, Peer, PeerSet, ProducerSource, ProducersEvent, TimeSource,
};

// Services
pub use service::finder::{FinderPorts, SUBSCRIBER_NAME};
pub use service::{Discovery, DiscoveryError, Finder, ObserverCallback};

// Wire
pub use wire::{Message, MessageCode, WireError};

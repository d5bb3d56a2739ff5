//! # Adapters
//!
//! Concrete implementations of the driven ports.
//!
//! - `KademliaTable` - in-memory node table
//! - `PeerRegistry` - connected sessions
//! - `StaticProducerSource` - fixed or operator-rotated producer set
//! - `SystemTimeSource` - wall clock
//! - `network` - UDP transport, TCP connector, TOML config
//!   (requires the "network" feature)

pub mod consensus;
pub mod peers;
pub mod table;
pub mod time;

#[cfg(feature = "network")]
pub mod network;

pub use consensus::StaticProducerSource;
pub use peers::{PeerRegistry, SessionPeer};
pub use table::KademliaTable;
pub use time::SystemTimeSource;

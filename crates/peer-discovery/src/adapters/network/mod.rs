//! # Network Adapters
//!
//! - `UdpTransport` - tokio UDP socket carrying discovery packets
//! - `TcpConnector` - outbound TCP sessions for the finder
//! - `NodeConfig` - TOML node configuration
//!
//! Requires the "network" feature.

/// Configuration file loading
pub mod config;
/// Outbound session establishment
pub mod connector;
/// Datagram transport
pub mod transport;

pub use config::{ConfigError, NodeConfig};
pub use connector::TcpConnector;
pub use transport::UdpTransport;

#[cfg(test)]
mod tests;

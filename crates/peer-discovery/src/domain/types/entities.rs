//! Core Domain Entities for Peer Discovery

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared_crypto::{blake3_hash, ct_eq, CryptoError, Ed25519PublicKey};

use super::errors::DescriptorError;

/// 256-bit node identifier: the node's Ed25519 public key.
///
/// Doubles as the Kademlia distance key and as the authentication anchor
/// of every discovery packet (the packet signature must verify under the
/// `id` the message claims).
///
/// # Security (Timing Attack Prevention)
///
/// Equality is constant-time. Standard `PartialEq` for byte arrays
/// short-circuits on the first difference.
// SAFETY: derived_hash_with_manual_eq is intentionally allowed here.
// Equal NodeIds have equal bytes and therefore equal hashes.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Clone, Copy, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 32]);

impl PartialEq for NodeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ct_eq(&self.0, &other.0)
    }
}

impl Eq for NodeId {}

impl NodeId {
    /// Create a NodeId from raw 32-byte array.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// NodeId of the holder of `key`.
    pub fn from_public_key(key: &Ed25519PublicKey) -> Self {
        Self(*key.as_bytes())
    }

    /// Get the underlying bytes for XOR distance calculation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret the id as the Ed25519 public key that signs for it.
    pub fn public_key(&self) -> Result<Ed25519PublicKey, CryptoError> {
        Ed25519PublicKey::from_bytes(self.0)
    }

    /// Create a zero-initialized NodeId.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}..)", &hex::encode(&self.0[..4]))
    }
}

impl FromStr for NodeId {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| DescriptorError::InvalidNodeId)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DescriptorError::InvalidNodeId)?;
        Ok(Self(arr))
    }
}

/// Blockchain account address (20 bytes).
///
/// Derived from an Ed25519 public key as the leading 20 bytes of its
/// BLAKE3 hash. Producer sets are expressed in addresses, never in NodeIds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Address length in bytes.
    pub const LEN: usize = 20;

    /// Derive the address owned by `key`.
    pub fn from_public_key(key: &Ed25519PublicKey) -> Self {
        let digest = blake3_hash(key.as_bytes());
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&digest[..Self::LEN]);
        Self(out)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sbp_{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = DescriptorError;

    /// Accepts the `Display` form or bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("sbp_").unwrap_or(s);
        let bytes = hex::decode(hex_part).map_err(|_| DescriptorError::InvalidAddress)?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| DescriptorError::InvalidAddress)?;
        Ok(Self(arr))
    }
}

/// IP address enum supporting both IPv4 and IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpAddr {
    /// IPv4 address (4 bytes).
    V4([u8; 4]),
    /// IPv6 address (16 bytes).
    V6([u8; 16]),
}

impl IpAddr {
    /// Create an IPv4 address
    pub fn v4(a: u8, b: u8, c: u8, d: u8) -> Self {
        IpAddr::V4([a, b, c, d])
    }

    /// Create an IPv6 address from bytes
    pub fn v6(bytes: [u8; 16]) -> Self {
        IpAddr::V6(bytes)
    }

    /// Check if this is an IPv4 address
    pub fn is_ipv4(&self) -> bool {
        matches!(self, IpAddr::V4(_))
    }
}

impl From<std::net::IpAddr> for IpAddr {
    fn from(ip: std::net::IpAddr) -> Self {
        match ip {
            std::net::IpAddr::V4(v4) => IpAddr::V4(v4.octets()),
            std::net::IpAddr::V6(v6) => IpAddr::V6(v6.octets()),
        }
    }
}

impl From<IpAddr> for std::net::IpAddr {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(bytes) => std::net::IpAddr::V4(std::net::Ipv4Addr::from(bytes)),
            IpAddr::V6(bytes) => std::net::IpAddr::V6(std::net::Ipv6Addr::from(bytes)),
        }
    }
}

/// A discoverable node.
///
/// `ext` is opaque to the table and the codec. Validator-operated nodes
/// fill it with an ownership proof (see `domain::node_ext`).
///
/// Nodes are immutable once built: re-discovery produces a new value that
/// replaces the old one wherever it is stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier (Ed25519 public key).
    pub id: NodeId,
    /// Reachable IP address.
    pub ip: IpAddr,
    /// Discovery (UDP) port.
    pub udp_port: u16,
    /// Session (TCP) port.
    pub tcp_port: u16,
    /// Extension field; empty for ordinary nodes.
    pub ext: Vec<u8>,
}

impl Node {
    /// Create a node without extension data.
    pub fn new(id: NodeId, ip: IpAddr, udp_port: u16, tcp_port: u16) -> Self {
        Self {
            id,
            ip,
            udp_port,
            tcp_port,
            ext: Vec::new(),
        }
    }

    /// Create a node reachable at `addr` for both UDP and TCP.
    pub fn from_socket_addr(id: NodeId, addr: std::net::SocketAddr) -> Self {
        Self::new(id, addr.ip().into(), addr.port(), addr.port())
    }

    /// Same node with `ext` attached.
    #[must_use]
    pub fn with_ext(mut self, ext: Vec<u8>) -> Self {
        self.ext = ext;
        self
    }

    /// Discovery endpoint.
    pub fn udp_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.ip.into(), self.udp_port)
    }

    /// Session endpoint.
    pub fn tcp_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.ip.into(), self.tcp_port)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("udp", &self.udp_addr())
            .field("tcp_port", &self.tcp_port)
            .field("ext_len", &self.ext.len())
            .finish()
    }
}

/// Unix timestamp in seconds
///
/// # Security (Timestamp Bounds)
///
/// Timestamps are clamped to a reasonable maximum to prevent overflow
/// in comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

//! # Wire Codec
//!
//! Signed, checksummed envelope for the four discovery messages.
//!
//! ```text
//! ┌─────────┬──────┬──────────────┬───────────────┬──────────────────┐
//! │ version │ code │ checksum(32) │ signature(64) │ payload (≤1200)  │
//! └─────────┴──────┴──────────────┴───────────────┴──────────────────┘
//! checksum  = BLAKE3(signature ++ payload)
//! signature = Ed25519(sender key, payload)
//! ```
//!
//! The whole packet stays under 1400 bytes so it fits a single UDP datagram
//! on common paths. The sender key is not carried in the envelope: it is the
//! `id` field of the decoded message, so a packet authenticates exactly the
//! identity it claims.

mod envelope;
mod error;
mod message;

pub use envelope::{compose, parse};
pub use error::WireError;
pub use message::{FindNode, Message, MessageCode, Neighbors, Ping, Pong};

/// Protocol version byte.
pub const VERSION: u8 = 1;

/// Hard cap on a full packet.
pub const MAX_PACKET_LEN: usize = 1400;

/// Cap on the encoded message payload.
pub const MAX_PAYLOAD_LEN: usize = 1200;

/// Cap on nodes carried by one `Neighbors` message.
pub const MAX_NEIGHBORS_NODES: usize = 10;

/// version(1) + code(1) + checksum(32) + signature(64)
pub const HEADER_LEN: usize = 1 + 1 + 32 + 64;

/// Packet checksum, also used to correlate a Pong with its Ping.
pub type PacketHash = [u8; 32];

//! Wire protocol errors.
//!
//! Every variant means "drop the packet". None of them is retried and none
//! may change node table or finder state.

use thiserror::Error;

/// Errors raised while composing or parsing a discovery packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Packet shorter than the fixed header
    #[error("packet too short: {len} bytes")]
    PacketTooShort {
        /// Received length
        len: usize,
    },
    /// Packet longer than the datagram cap
    #[error("packet too large: {len} bytes")]
    PacketTooLarge {
        /// Received length
        len: usize,
    },
    /// Payload would push the packet over the datagram cap
    #[error("payload too large: {len} bytes")]
    PayloadTooLarge {
        /// Encoded payload length
        len: usize,
    },
    /// Version byte is not ours
    #[error("unmatched version {0}")]
    UnmatchedVersion(u8),
    /// Checksum does not cover signature and payload
    #[error("validate packet error: wrong hash")]
    WrongHash,
    /// Message code outside the known set
    #[error("unknown message code {0}")]
    UnknownCode(u8),
    /// Payload does not decode as the announced message
    #[error("malformed payload: {0}")]
    Decode(String),
    /// Payload could not be encoded
    #[error("cannot encode payload: {0}")]
    Encode(String),
    /// Signature does not verify under the claimed sender id
    #[error("validate packet error: invalid signature")]
    InvalidSignature,
}

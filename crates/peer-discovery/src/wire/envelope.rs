//! Packet framing: compose and parse.

use shared_crypto::{blake3_hash_many, ct_eq, Ed25519KeyPair, Ed25519Signature};

use super::{
    Message, PacketHash, WireError, HEADER_LEN, MAX_PACKET_LEN, VERSION,
};

const CHECKSUM_RANGE: std::ops::Range<usize> = 2..34;
const SIGNATURE_RANGE: std::ops::Range<usize> = 34..98;

/// Frame `payload` under `code`, signed by `key`.
///
/// Returns the packet and its checksum. Callers keep `payload` within
/// `MAX_PAYLOAD_LEN`; [`Message::pack`] enforces that.
pub fn compose(key: &Ed25519KeyPair, code: u8, payload: &[u8]) -> (Vec<u8>, PacketHash) {
    let signature = key.sign(payload);
    let checksum = blake3_hash_many(&[&signature.as_bytes()[..], payload]);

    let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());
    packet.push(VERSION);
    packet.push(code);
    packet.extend_from_slice(&checksum);
    packet.extend_from_slice(signature.as_bytes());
    packet.extend_from_slice(payload);

    (packet, checksum)
}

/// Validate and decode a packet.
///
/// Checks run cheapest first: size, version, checksum, decode, signature.
/// On success returns the message and the packet checksum.
pub fn parse(packet: &[u8]) -> Result<(Message, PacketHash), WireError> {
    if packet.len() < HEADER_LEN {
        return Err(WireError::PacketTooShort { len: packet.len() });
    }
    if packet.len() > MAX_PACKET_LEN {
        return Err(WireError::PacketTooLarge { len: packet.len() });
    }

    if packet[0] != VERSION {
        return Err(WireError::UnmatchedVersion(packet[0]));
    }

    let code = packet[1];
    let checksum = &packet[CHECKSUM_RANGE];
    let signature = &packet[SIGNATURE_RANGE];
    let payload = &packet[HEADER_LEN..];

    let recomputed = blake3_hash_many(&[signature, payload]);
    if !ct_eq(&recomputed, checksum) {
        return Err(WireError::WrongHash);
    }

    let message = Message::deserialize(code, payload)?;

    let sender = message
        .sender()
        .public_key()
        .map_err(|_| WireError::InvalidSignature)?;
    let signature =
        Ed25519Signature::from_slice(signature).map_err(|_| WireError::InvalidSignature)?;
    sender
        .verify(payload, &signature)
        .map_err(|_| WireError::InvalidSignature)?;

    Ok((message, recomputed))
}

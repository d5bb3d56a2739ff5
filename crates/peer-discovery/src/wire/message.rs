//! Discovery messages and their payload encoding.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared_crypto::Ed25519KeyPair;

use super::{compose, PacketHash, WireError, MAX_NEIGHBORS_NODES, MAX_PAYLOAD_LEN};
use crate::domain::{Node, NodeId};

/// Message code carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageCode {
    /// Liveness probe.
    Ping = 1,
    /// Reply to a Ping.
    Pong = 2,
    /// Request for nodes close to a target id.
    FindNode = 3,
    /// Reply to a FindNode.
    Neighbors = 4,
}

impl MessageCode {
    /// Every code, in wire order.
    pub const ALL: [MessageCode; 4] = [
        MessageCode::Ping,
        MessageCode::Pong,
        MessageCode::FindNode,
        MessageCode::Neighbors,
    ];
}

impl TryFrom<u8> for MessageCode {
    type Error = WireError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| *c as u8 == code)
            .ok_or(WireError::UnknownCode(code))
    }
}

/// Liveness probe.
///
/// `ext` is the sender's own ownership proof (empty for ordinary nodes), so
/// the receiver can record validator nodes that ping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    /// Sender id
    pub id: NodeId,
    /// Sender's `Node::ext`
    pub ext: Vec<u8>,
}

/// Reply to a Ping, echoing the Ping packet's checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    /// Sender id
    pub id: NodeId,
    /// Checksum of the Ping being answered
    pub ping_hash: PacketHash,
}

/// Request for nodes close to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindNode {
    /// Sender id
    pub id: NodeId,
    /// Id to search around
    pub target: NodeId,
}

/// Reply to a FindNode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbors {
    /// Sender id
    pub id: NodeId,
    /// At most `MAX_NEIGHBORS_NODES` nodes
    pub nodes: Vec<Node>,
}

impl Neighbors {
    /// Split `nodes` into as many messages as needed so that each one holds
    /// at most `MAX_NEIGHBORS_NODES` nodes and encodes within
    /// `MAX_PAYLOAD_LEN`.
    pub fn split(id: NodeId, nodes: Vec<Node>) -> Result<Vec<Neighbors>, WireError> {
        let mut out = Vec::new();
        let mut current = Neighbors {
            id,
            nodes: Vec::new(),
        };

        for node in nodes {
            current.nodes.push(node);
            if current.nodes.len() <= MAX_NEIGHBORS_NODES
                && encoded_len(&current)? <= MAX_PAYLOAD_LEN
            {
                continue;
            }

            // The node that overflowed starts the next message.
            let Some(overflow) = current.nodes.pop() else {
                continue;
            };
            if current.nodes.is_empty() {
                return Err(WireError::PayloadTooLarge {
                    len: encoded_len(&Neighbors {
                        id,
                        nodes: vec![overflow],
                    })?,
                });
            }
            out.push(std::mem::replace(
                &mut current,
                Neighbors {
                    id,
                    nodes: vec![overflow],
                },
            ));
        }

        if !current.nodes.is_empty() {
            out.push(current);
        }
        Ok(out)
    }
}

/// The closed set of discovery messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// See [`Ping`]
    Ping(Ping),
    /// See [`Pong`]
    Pong(Pong),
    /// See [`FindNode`]
    FindNode(FindNode),
    /// See [`Neighbors`]
    Neighbors(Neighbors),
}

impl Message {
    /// Envelope code for this message.
    pub fn code(&self) -> MessageCode {
        match self {
            Message::Ping(_) => MessageCode::Ping,
            Message::Pong(_) => MessageCode::Pong,
            Message::FindNode(_) => MessageCode::FindNode,
            Message::Neighbors(_) => MessageCode::Neighbors,
        }
    }

    /// The identity the sender claims; the packet signature must verify
    /// under it.
    pub fn sender(&self) -> &NodeId {
        match self {
            Message::Ping(m) => &m.id,
            Message::Pong(m) => &m.id,
            Message::FindNode(m) => &m.id,
            Message::Neighbors(m) => &m.id,
        }
    }

    /// Encode the payload.
    pub fn serialize(&self) -> Result<Vec<u8>, WireError> {
        match self {
            Message::Ping(m) => encode(m),
            Message::Pong(m) => encode(m),
            Message::FindNode(m) => encode(m),
            Message::Neighbors(m) => encode(m),
        }
    }

    /// Decode a payload announced with `code`.
    pub fn deserialize(code: u8, payload: &[u8]) -> Result<Self, WireError> {
        Ok(match MessageCode::try_from(code)? {
            MessageCode::Ping => Message::Ping(decode(payload)?),
            MessageCode::Pong => Message::Pong(decode(payload)?),
            MessageCode::FindNode => Message::FindNode(decode(payload)?),
            MessageCode::Neighbors => Message::Neighbors(decode(payload)?),
        })
    }

    /// Encode, sign and frame this message.
    ///
    /// Returns the packet and its checksum.
    pub fn pack(&self, key: &Ed25519KeyPair) -> Result<(Vec<u8>, PacketHash), WireError> {
        if let Message::Neighbors(n) = self {
            if n.nodes.len() > MAX_NEIGHBORS_NODES {
                return Err(WireError::Encode(format!(
                    "{} neighbors exceed the per-message cap",
                    n.nodes.len()
                )));
            }
        }

        let payload = self.serialize()?;
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(WireError::PayloadTooLarge { len: payload.len() });
        }
        Ok(compose(key, self.code() as u8, &payload))
    }
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    options()
        .serialize(value)
        .map_err(|e| WireError::Encode(e.to_string()))
}

fn encoded_len<T: Serialize>(value: &T) -> Result<usize, WireError> {
    options()
        .serialized_size(value)
        .map(|n| n as usize)
        .map_err(|e| WireError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, WireError> {
    options()
        .with_limit(MAX_PAYLOAD_LEN as u64)
        .deserialize(payload)
        .map_err(|e| WireError::Decode(e.to_string()))
}

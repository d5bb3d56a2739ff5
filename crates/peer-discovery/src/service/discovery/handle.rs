//! Inbound packet dispatch.

use std::net::SocketAddr;

use tracing::{debug, trace};

use super::{Discovery, DiscoveryError};
use crate::domain::Node;
use crate::wire::{self, Message, Neighbors, PacketHash, Pong, MAX_NEIGHBORS_NODES};

impl Discovery {
    /// Process one inbound datagram.
    ///
    /// Protocol errors drop the packet and leave all state untouched.
    pub fn handle_packet(&self, origin: SocketAddr, packet: &[u8]) {
        let (message, hash) = match wire::parse(packet) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(%origin, error = %e, "dropping discovery packet");
                return;
            }
        };

        if *message.sender() == self.id() {
            return;
        }

        let code = message.code();
        if let Err(e) = message.handle(self, origin, hash) {
            debug!(%origin, ?code, error = %e, "failed to handle discovery message");
        }
    }

    /// Pack `message` and send it to `to`. Returns the packet hash.
    pub fn send(&self, to: SocketAddr, message: &Message) -> Result<PacketHash, DiscoveryError> {
        let (packet, hash) = message.pack(&self.key)?;
        self.sender.send_packet(to, &packet)?;
        Ok(hash)
    }
}

impl Message {
    /// React to a verified message received from `origin`.
    ///
    /// `hash` is the checksum of the packet that carried it.
    pub fn handle(
        self,
        ctx: &Discovery,
        origin: SocketAddr,
        hash: PacketHash,
    ) -> Result<(), DiscoveryError> {
        match self {
            Message::Ping(ping) => {
                let node = Node::from_socket_addr(ping.id, origin).with_ext(ping.ext);
                ctx.learn(node);

                let pong = Message::Pong(Pong {
                    id: ctx.id(),
                    ping_hash: hash,
                });
                ctx.send(origin, &pong)?;
                Ok(())
            }
            Message::FindNode(find) => {
                let closest = ctx.table().closest_to(&find.target, MAX_NEIGHBORS_NODES);
                if closest.is_empty() {
                    return Ok(());
                }
                for chunk in Neighbors::split(ctx.id(), closest)? {
                    ctx.send(origin, &Message::Neighbors(chunk))?;
                }
                Ok(())
            }
            reply @ (Message::Pong(_) | Message::Neighbors(_)) => {
                let code = reply.code();
                let sender = *reply.sender();
                if !ctx.correlator.deliver(reply) {
                    trace!(%origin, ?code, ?sender, "unsolicited reply");
                }
                Ok(())
            }
        }
    }
}

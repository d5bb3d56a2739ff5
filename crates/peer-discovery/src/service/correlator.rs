//! Matches inbound replies with outstanding requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::NodeId;
use crate::wire::{Message, MessageCode, PacketHash};

type Key = (MessageCode, NodeId);

struct Waiter {
    id: u64,
    /// Pongs must echo this hash
    ping_hash: Option<PacketHash>,
    tx: mpsc::UnboundedSender<Message>,
}

/// Pending requests keyed by the reply code and the node expected to send it.
#[derive(Default)]
pub(crate) struct Correlator {
    pending: Mutex<HashMap<Key, Vec<Waiter>>>,
    next_id: AtomicU64,
}

/// Receiving end of a registered expectation.
///
/// Dropping it withdraws the expectation.
pub(crate) struct Reply<'a> {
    correlator: &'a Correlator,
    key: Key,
    id: u64,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Reply<'_> {
    /// Next matching message, or `None` once withdrawn.
    pub(crate) async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

impl Drop for Reply<'_> {
    fn drop(&mut self) {
        self.correlator.withdraw(&self.key, self.id);
    }
}

impl Correlator {
    /// Expect messages with `code` from `from`.
    pub(crate) fn expect(
        &self,
        code: MessageCode,
        from: NodeId,
        ping_hash: Option<PacketHash>,
    ) -> Reply<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let key = (code, from);

        self.pending
            .lock()
            .entry(key)
            .or_default()
            .push(Waiter { id, ping_hash, tx });

        Reply {
            correlator: self,
            key,
            id,
            rx,
        }
    }

    /// Route `message` to every matching waiter.
    ///
    /// Returns `false` for unsolicited replies.
    pub(crate) fn deliver(&self, message: Message) -> bool {
        let key = (message.code(), *message.sender());
        let echoed = match &message {
            Message::Pong(pong) => Some(pong.ping_hash),
            _ => None,
        };

        let pending = self.pending.lock();
        let Some(waiters) = pending.get(&key) else {
            return false;
        };

        let mut matched = false;
        for waiter in waiters {
            if waiter.ping_hash.is_some() && waiter.ping_hash != echoed {
                continue;
            }
            matched |= waiter.tx.send(message.clone()).is_ok();
        }
        matched
    }

    /// Number of outstanding expectations.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }

    fn withdraw(&self, key: &Key, id: u64) {
        let mut pending = self.pending.lock();
        if let Some(waiters) = pending.get_mut(key) {
            waiters.retain(|w| w.id != id);
            if waiters.is_empty() {
                pending.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Neighbors, Pong};

    fn pong(from: NodeId, ping_hash: PacketHash) -> Message {
        Message::Pong(Pong {
            id: from,
            ping_hash,
        })
    }

    #[tokio::test]
    async fn test_pong_matches_only_its_ping_hash() {
        let correlator = Correlator::default();
        let peer = NodeId::new([1; 32]);
        let mut reply = correlator.expect(MessageCode::Pong, peer, Some([7; 32]));

        assert!(!correlator.deliver(pong(peer, [8; 32])));
        assert!(!correlator.deliver(pong(NodeId::new([2; 32]), [7; 32])));
        assert!(correlator.deliver(pong(peer, [7; 32])));

        assert_eq!(reply.recv().await, Some(pong(peer, [7; 32])));
    }

    #[tokio::test]
    async fn test_neighbors_fan_out_to_every_waiter() {
        let correlator = Correlator::default();
        let peer = NodeId::new([3; 32]);
        let mut a = correlator.expect(MessageCode::Neighbors, peer, None);
        let mut b = correlator.expect(MessageCode::Neighbors, peer, None);

        let message = Message::Neighbors(Neighbors {
            id: peer,
            nodes: vec![],
        });
        assert!(correlator.deliver(message.clone()));
        assert_eq!(a.recv().await, Some(message.clone()));
        assert_eq!(b.recv().await, Some(message));
    }

    #[test]
    fn test_dropping_reply_withdraws_expectation() {
        let correlator = Correlator::default();
        let peer = NodeId::new([4; 32]);
        {
            let _reply = correlator.expect(MessageCode::Pong, peer, Some([0; 32]));
            assert_eq!(correlator.len(), 1);
        }
        assert_eq!(correlator.len(), 0);
        assert!(!correlator.deliver(pong(peer, [0; 32])));
    }
}

//! Centralized Testing Utilities
//!
//! Mock ports and fixtures shared by the crate's tests. Available to other
//! crates with the `test-utils` feature flag.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_crypto::Ed25519KeyPair;
use tokio::sync::{mpsc, Notify};

use crate::domain::{Address, IpAddr, Node, NodeId, Timestamp};
use crate::ports::{
    ConnectError, ConsensusError, Connector, NetworkError, NodeCallback, NodeFeed, NodeResolver,
    PacketSender, Peer, PeerSet, ProducerSource, ProducersCallback, ProducersEvent, TimeSource,
};

// =============================================================================
// FIXTURES
// =============================================================================

/// Deterministic key pair for `seed`.
pub fn keypair(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([seed; 32])
}

/// Node owned by `keypair(seed)`, reachable at `10.0.0.<seed>:8483`.
pub fn node(seed: u8) -> Node {
    Node::new(
        NodeId::from_public_key(&keypair(seed).public_key()),
        IpAddr::v4(10, 0, 0, seed),
        8483,
        8483,
    )
}

/// Address owned by `keypair(seed)`.
pub fn address(seed: u8) -> Address {
    Address::from_public_key(&keypair(seed).public_key())
}

// =============================================================================
// TIME
// =============================================================================

/// A time source that returns a fixed timestamp.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    timestamp: u64,
}

impl FixedTimeSource {
    /// Create a new fixed time source with the given timestamp (in seconds).
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.timestamp)
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Records every connection attempt.
///
/// In hold mode attempts stay pending until [`MockConnector::release`].
#[derive(Default)]
pub struct MockConnector {
    attempts: Mutex<Vec<Node>>,
    hold: bool,
    fail: bool,
    released: Notify,
    completed: AtomicUsize,
}

impl MockConnector {
    /// Attempts succeed immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts stay pending until released.
    pub fn holding() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }

    /// Attempts fail immediately.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every node dialled so far, in order.
    pub fn attempts(&self) -> Vec<Node> {
        self.attempts.lock().clone()
    }

    /// Number of dials so far.
    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }

    /// Number of attempts that returned.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Let every held attempt return.
    pub fn release(&self) {
        self.released.notify_waiters();
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect_node(&self, node: &Node) -> Result<(), ConnectError> {
        // Register before recording so a release issued after the attempt
        // is observed cannot be missed.
        let released = self.released.notified();
        self.attempts.lock().push(node.clone());

        if self.hold {
            released.await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            Err(ConnectError::Io("refused".into()))
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// PEER SET
// =============================================================================

/// Connected peer with an observable superior flag.
pub struct MockPeer {
    id: NodeId,
    superior: Mutex<bool>,
}

impl MockPeer {
    /// Current superior flag.
    pub fn is_superior(&self) -> bool {
        *self.superior.lock()
    }
}

impl Peer for MockPeer {
    fn id(&self) -> NodeId {
        self.id
    }

    fn set_superior(&self, superior: bool) {
        *self.superior.lock() = superior;
    }
}

/// In-memory peer set.
#[derive(Default)]
pub struct MockPeerSet {
    peers: RwLock<HashMap<NodeId, Arc<MockPeer>>>,
}

impl MockPeerSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connected peer.
    pub fn connect(&self, id: NodeId) -> Arc<MockPeer> {
        let peer = Arc::new(MockPeer {
            id,
            superior: Mutex::new(false),
        });
        self.peers.write().insert(id, Arc::clone(&peer));
        peer
    }
}

impl PeerSet for MockPeerSet {
    fn count_excluding_sbp(&self) -> usize {
        self.peers.read().values().filter(|p| !p.is_superior()).count()
    }

    fn lookup(&self, id: &NodeId) -> Option<Arc<dyn Peer>> {
        self.peers
            .read()
            .get(id)
            .map(|p| Arc::clone(p) as Arc<dyn Peer>)
    }
}

// =============================================================================
// CONSENSUS
// =============================================================================

/// Scriptable producer source.
pub struct MockProducerSource {
    current: Mutex<Result<Vec<Address>, ConsensusError>>,
    subscriptions: Mutex<HashMap<(String, String), ProducersCallback>>,
}

impl Default for MockProducerSource {
    fn default() -> Self {
        Self::with_producers(Vec::new())
    }
}

impl MockProducerSource {
    /// Snapshot reads return `producers`.
    pub fn with_producers(producers: Vec<Address>) -> Self {
        Self {
            current: Mutex::new(Ok(producers)),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot reads fail.
    pub fn unavailable() -> Self {
        Self {
            current: Mutex::new(Err(ConsensusError::NotReady)),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a subscription exists under `(group, name)`.
    pub fn is_subscribed(&self, group: &str, name: &str) -> bool {
        self.subscriptions
            .lock()
            .contains_key(&(group.to_string(), name.to_string()))
    }

    /// Deliver `event` to every subscriber.
    pub fn emit(&self, event: ProducersEvent) {
        let callbacks: Vec<_> = self.subscriptions.lock().values().cloned().collect();
        for callback in callbacks {
            callback(event.clone());
        }
    }
}

impl ProducerSource for MockProducerSource {
    fn read_current_producers(&self, _now: Timestamp) -> Result<Vec<Address>, ConsensusError> {
        self.current.lock().clone()
    }

    fn subscribe_producers(&self, group: &str, name: &str, callback: ProducersCallback) {
        self.subscriptions
            .lock()
            .insert((group.to_string(), name.to_string()), callback);
    }

    fn unsubscribe_producers(&self, group: &str, name: &str) {
        self.subscriptions
            .lock()
            .remove(&(group.to_string(), name.to_string()));
    }
}

// =============================================================================
// RESOLVER & FEED
// =============================================================================

/// Resolver returning a fixed list, recording requested counts.
#[derive(Default)]
pub struct MockResolver {
    nodes: Vec<Node>,
    requests: Mutex<Vec<usize>>,
}

impl MockResolver {
    /// Resolver over `nodes`.
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every `n` requested so far.
    pub fn requests(&self) -> Vec<usize> {
        self.requests.lock().clone()
    }
}

impl NodeResolver for MockResolver {
    fn get_nodes(&self, n: usize) -> Vec<Node> {
        self.requests.lock().push(n);
        self.nodes.iter().take(n).cloned().collect()
    }
}

/// Node feed driven by hand.
#[derive(Default)]
pub struct MockNodeFeed {
    subscribers: Mutex<HashMap<u64, NodeCallback>>,
    next_id: AtomicU64,
}

impl MockNodeFeed {
    /// Empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `node` to every subscriber.
    pub fn publish(&self, node: Node) {
        let callbacks: Vec<_> = self.subscribers.lock().values().cloned().collect();
        for callback in callbacks {
            callback(node.clone());
        }
    }

    /// Live subscription count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl NodeFeed for MockNodeFeed {
    fn subscribe(&self, callback: NodeCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(id, callback);
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().remove(&id);
    }
}

// =============================================================================
// IN-MEMORY NETWORK
// =============================================================================

/// Datagram delivered by [`MemoryNetwork`]: `(from, packet)`.
pub type Datagram = (SocketAddr, Vec<u8>);

/// Lossless in-memory datagram switch.
#[derive(Default)]
pub struct MemoryNetwork {
    endpoints: Mutex<HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>>,
    muted: Mutex<HashSet<SocketAddr>>,
}

impl MemoryNetwork {
    /// Empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach `addr`; returns its sender and inbound queue.
    pub fn attach(
        self: &Arc<Self>,
        addr: SocketAddr,
    ) -> (Arc<MemorySender>, mpsc::UnboundedReceiver<Datagram>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.endpoints.lock().insert(addr, tx);
        let sender = Arc::new(MemorySender {
            network: Arc::clone(self),
            local: addr,
            sent: Mutex::new(Vec::new()),
        });
        (sender, rx)
    }

    /// Silently drop everything sent by `addr`.
    pub fn mute(&self, addr: SocketAddr) {
        self.muted.lock().insert(addr);
    }
}

/// [`PacketSender`] bound to one [`MemoryNetwork`] endpoint.
pub struct MemorySender {
    network: Arc<MemoryNetwork>,
    local: SocketAddr,
    sent: Mutex<Vec<Datagram>>,
}

impl MemorySender {
    /// Every `(to, packet)` sent so far.
    pub fn sent(&self) -> Vec<Datagram> {
        self.sent.lock().clone()
    }
}

impl PacketSender for MemorySender {
    fn send_packet(&self, to: SocketAddr, packet: &[u8]) -> Result<(), NetworkError> {
        self.sent.lock().push((to, packet.to_vec()));
        if self.network.muted.lock().contains(&self.local) {
            return Ok(());
        }
        if let Some(endpoint) = self.network.endpoints.lock().get(&to) {
            let _ = endpoint.send((self.local, packet.to_vec()));
        }
        Ok(())
    }
}

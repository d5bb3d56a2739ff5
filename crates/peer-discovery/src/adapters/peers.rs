use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::domain::NodeId;
use crate::ports::{Peer, PeerSet};

/// An established outbound session.
///
/// A session attached over a stream is watched by a task that owns the
/// stream; dropping the session aborts that task and closes the socket.
#[derive(Debug)]
pub struct SessionPeer {
    id: NodeId,
    remote: SocketAddr,
    superior: AtomicBool,
    watcher: Mutex<Option<AbortHandle>>,
}

impl SessionPeer {
    /// Session without a live stream.
    pub fn new(id: NodeId, remote: SocketAddr) -> Self {
        Self {
            id,
            remote,
            superior: AtomicBool::new(false),
            watcher: Mutex::new(None),
        }
    }

    /// Remote endpoint.
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Whether the peer is flagged as an elected producer.
    pub fn is_superior(&self) -> bool {
        self.superior.load(Ordering::Relaxed)
    }
}

impl Drop for SessionPeer {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.abort();
        }
    }
}

impl Peer for SessionPeer {
    fn id(&self) -> NodeId {
        self.id
    }

    fn set_superior(&self, superior: bool) {
        self.superior.store(superior, Ordering::Relaxed);
    }
}

/// The node's connected sessions.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<NodeId, Arc<SessionPeer>>>,
}

impl PeerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Returns `false` if one already exists for its id.
    pub fn add(&self, peer: SessionPeer) -> bool {
        let mut peers = self.peers.write();
        if peers.contains_key(&peer.id) {
            return false;
        }
        peers.insert(peer.id, Arc::new(peer));
        true
    }

    /// Register a session over `stream` and keep it only while the remote
    /// keeps the connection open. Returns `Ok(false)` if a session already
    /// exists for `id`, in which case `stream` is closed.
    ///
    /// No session protocol runs yet, so inbound bytes are discarded.
    pub fn attach(self: &Arc<Self>, id: NodeId, stream: TcpStream) -> std::io::Result<bool> {
        let peer = Arc::new(SessionPeer::new(id, stream.peer_addr()?));
        {
            let mut peers = self.peers.write();
            if peers.contains_key(&id) {
                return Ok(false);
            }
            peers.insert(id, Arc::clone(&peer));
        }

        let registry = Arc::downgrade(self);
        let session = Arc::downgrade(&peer);
        let watcher = tokio::spawn(async move {
            wait_closed(stream).await;
            if let (Some(registry), Some(session)) = (registry.upgrade(), session.upgrade()) {
                registry.remove_session(&session);
            }
        });
        *peer.watcher.lock() = Some(watcher.abort_handle());
        Ok(true)
    }

    /// Drop `session` if it is still the one registered under its id.
    fn remove_session(&self, session: &Arc<SessionPeer>) {
        let mut peers = self.peers.write();
        if peers
            .get(&session.id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            peers.remove(&session.id);
            debug!(id = ?session.id, remote = %session.remote, "session closed");
        }
    }

    /// Drop the session with `id`.
    pub fn remove(&self, id: &NodeId) -> Option<Arc<SessionPeer>> {
        self.peers.write().remove(id)
    }

    /// Whether a session with `id` exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.peers.read().contains_key(id)
    }

    /// Total sessions, producers included.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// True when no session is open.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

/// Resolves once the remote closes `stream` or it fails.
async fn wait_closed(mut stream: TcpStream) {
    let mut buf = [0u8; 512];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

impl PeerSet for PeerRegistry {
    fn count_excluding_sbp(&self) -> usize {
        self.peers
            .read()
            .values()
            .filter(|p| !p.is_superior())
            .count()
    }

    fn lookup(&self, id: &NodeId) -> Option<Arc<dyn Peer>> {
        self.peers
            .read()
            .get(id)
            .map(|p| Arc::clone(p) as Arc<dyn Peer>)
    }
}

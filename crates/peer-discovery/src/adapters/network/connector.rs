use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use crate::adapters::PeerRegistry;
use crate::domain::Node;
use crate::ports::{ConnectError, Connector};

/// Opens a TCP connection to the node's session port and registers it.
///
/// Protocol handshakes belong to the session layer; a connection that is
/// established counts as a peer until the remote closes it.
pub struct TcpConnector {
    peers: Arc<PeerRegistry>,
    timeout: Duration,
}

impl TcpConnector {
    /// Connector registering sessions in `peers`.
    pub fn new(peers: Arc<PeerRegistry>, timeout: Duration) -> Self {
        Self { peers, timeout }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect_node(&self, node: &Node) -> Result<(), ConnectError> {
        if self.peers.contains(&node.id) {
            return Err(ConnectError::AlreadyConnected);
        }

        let addr = node.tcp_addr();
        let stream = time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ConnectError::Timeout)?
            .map_err(|e| ConnectError::Io(e.to_string()))?;

        let added = self
            .peers
            .attach(node.id, stream)
            .map_err(|e| ConnectError::Io(e.to_string()))?;
        if !added {
            return Err(ConnectError::AlreadyConnected);
        }

        debug!(id = ?node.id, %addr, "session established");
        Ok(())
    }
}

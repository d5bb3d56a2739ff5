//! # SBP-Net Node Runtime
//!
//! Wires the discovery service and the finder into a running node.
//!
//! ## Structure
//!
//! ```text
//!  UDP socket ──packets──→ Discovery ──new nodes──→ Finder ──dials──→ TcpConnector
//!                              ↑                       ↑                    │
//!                         refresh task        StaticProducerSource    PeerRegistry
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment overrides)
//! 2. Bind the discovery socket
//! 3. Build the node record, attaching the ownership proof for validators
//! 4. Start the finder, the receive loop and the refresh task
//! 5. Run until Ctrl+C
//!
//! The runtime only dials sessions. Peers reach this node on `tcp_port`, so
//! the session layer embedding it must accept connections there.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use peer_discovery::adapters::network::{NodeConfig, TcpConnector, UdpTransport};
use peer_discovery::adapters::{KademliaTable, PeerRegistry, StaticProducerSource, SystemTimeSource};
use peer_discovery::{
    set_node_ext, Address, Discovery, Finder, FinderPorts, Node, NodeId, NodeResolver,
};
use shared_crypto::Ed25519KeyPair;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Path read when `SBP_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "sbp-node.toml";

/// A running discovery node.
pub struct NodeRuntime {
    discovery: Arc<Discovery>,
    finder: Arc<Finder>,
    peers: Arc<PeerRegistry>,
    producers: Arc<StaticProducerSource>,
    transport: UdpTransport,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    /// Bind the socket and assemble the services.
    ///
    /// Nothing runs until [`NodeRuntime::start`].
    pub async fn new(config: &NodeConfig) -> Result<Self> {
        let key = config.node_key().context("node key")?;
        let producer_key = config.producer_key().context("producer key")?;
        let listen = config.listen_addr()?;

        let transport = UdpTransport::bind(listen)
            .await
            .with_context(|| format!("failed to bind {listen}"))?;
        let local = transport.local_addr()?;

        // An ephemeral listen port resolves to the bound one
        let tcp_port = match config.tcp_port()? {
            0 => local.port(),
            port => port,
        };
        let self_node = build_self_node(&key, producer_key.as_ref(), local, tcp_port);
        let self_addr = match &producer_key {
            Some(owner) => Address::from_public_key(&owner.public_key()),
            None => Address::from_public_key(&key.public_key()),
        };

        let discovery_config = config.discovery_config();
        let table = Arc::new(KademliaTable::new(self_node.id, discovery_config.table.clone()));
        let discovery = Arc::new(
            Discovery::new(
                key,
                self_node,
                table,
                Arc::new(transport.clone()),
                discovery_config,
            )
            .with_bootstrap_nodes(config.bootstrap_nodes()?),
        );

        let peers = Arc::new(PeerRegistry::new());
        let producers = Arc::new(StaticProducerSource::new(config.producers()?));
        let finder = Finder::new(
            self_addr,
            config.finder_config(),
            &config.finder.static_nodes,
            FinderPorts {
                peers: peers.clone(),
                connector: Arc::new(TcpConnector::new(peers.clone(), config.dial_timeout())),
                consensus: producers.clone(),
                resolver: Some(discovery.clone() as Arc<dyn NodeResolver>),
                time: Arc::new(SystemTimeSource::new()),
            },
        )?;

        let (shutdown_tx, _) = watch::channel(false);

        info!(
            id = %discovery.id(),
            address = %self_addr,
            udp = %local,
            validator = producer_key.is_some(),
            "node assembled"
        );

        Ok(Self {
            discovery,
            finder,
            peers,
            producers,
            transport,
            shutdown_tx,
            tasks: Vec::new(),
        })
    }

    /// Start the finder, the receive loop and the refresh task.
    pub fn start(&mut self) {
        self.finder.sub(&*self.discovery);
        self.finder.start();

        let transport = self.transport.clone();
        let discovery = self.discovery.clone();
        let shutdown = self.shutdown_tx.subscribe();
        self.tasks.push(tokio::spawn(async move {
            transport.run(discovery, shutdown).await;
        }));

        let discovery = self.discovery.clone();
        let shutdown = self.shutdown_tx.subscribe();
        self.tasks.push(tokio::spawn(discovery.run_refresh(shutdown)));

        info!("discovery node started");
    }

    /// Stop every task and release the finder.
    pub async fn shutdown(mut self) {
        info!("Initiating graceful shutdown...");

        self.finder.stop();
        self.finder.unsub(&*self.discovery);
        self.finder.clean();
        self.shutdown_tx.send_replace(true);

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("task ended abnormally: {}", e);
            }
        }

        info!(peers = self.peers.len(), "shutdown complete");
    }

    /// Discovery service.
    pub fn discovery(&self) -> &Arc<Discovery> {
        &self.discovery
    }

    /// Connection admission.
    pub fn finder(&self) -> &Arc<Finder> {
        &self.finder
    }

    /// Connected sessions.
    pub fn peers(&self) -> &Arc<PeerRegistry> {
        &self.peers
    }

    /// Producer set; operators rotate it with `set_producers`.
    pub fn producers(&self) -> &Arc<StaticProducerSource> {
        &self.producers
    }

    /// Bound discovery address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.transport.local_addr()?)
    }
}

/// The record this node advertises.
///
/// Validators attach an ownership proof signed by their producer key.
pub fn build_self_node(
    key: &Ed25519KeyPair,
    producer_key: Option<&Ed25519KeyPair>,
    udp: SocketAddr,
    tcp_port: u16,
) -> Node {
    let id = NodeId::from_public_key(&key.public_key());
    let node = Node::new(id, udp.ip().into(), udp.port(), tcp_port);
    match producer_key {
        Some(owner) => set_node_ext(owner, node),
        None => node,
    }
}

/// Load configuration from the file named by `SBP_CONFIG` (or
/// [`DEFAULT_CONFIG_PATH`] when it exists), then apply environment overrides.
///
/// - `SBP_NODE_KEY`: hex seed of the node key
/// - `SBP_PRODUCER_KEY`: hex seed of the validator key
/// - `SBP_LISTEN`: UDP listen address
pub fn load_config() -> Result<NodeConfig> {
    let mut config = match std::env::var("SBP_CONFIG") {
        Ok(path) => NodeConfig::load(&path)?,
        Err(_) if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
            NodeConfig::load(DEFAULT_CONFIG_PATH)?
        }
        Err(_) => {
            warn!("no configuration file, using defaults");
            NodeConfig::default()
        }
    };

    if let Ok(seed) = std::env::var("SBP_NODE_KEY") {
        config.node.private_key = Some(seed);
        info!("Loaded node key from environment");
    }
    if let Ok(seed) = std::env::var("SBP_PRODUCER_KEY") {
        config.node.producer_key = Some(seed);
        info!("Loaded producer key from environment");
    }
    if let Ok(listen) = std::env::var("SBP_LISTEN") {
        config.node.listen = listen;
    }

    Ok(config)
}

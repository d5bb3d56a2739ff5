//! Tests for network adapters

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::adapters::{KademliaTable, PeerRegistry};
use crate::domain::{DiscoveryConfig, Node, NodeId};
use crate::ports::{ConnectError, Connector, NetworkError, PacketSender, PeerSet};
use crate::service::Discovery;
use crate::testing::{keypair, node};

// =============================================================================
// CONFIG
// =============================================================================

#[test]
fn test_empty_config_uses_defaults() {
    let config = NodeConfig::parse("").unwrap();
    assert_eq!(config, NodeConfig::default());
    assert_eq!(config.listen_addr().unwrap().port(), 8483);
    assert_eq!(config.tcp_port().unwrap(), 8483);
    assert_eq!(config.finder_config().max_peers, 50);
    assert_eq!(config.finder_config().max_concurrent_dials, 100);
    assert_eq!(config.discovery_config(), DiscoveryConfig::default());
    assert!(config.producer_key().unwrap().is_none());
}

#[test]
fn test_full_config_parses() {
    let id = node(1).id;
    let content = format!(
        r#"
        [node]
        private_key = "{seed}"
        listen = "127.0.0.1:9000"
        tcp_port = 9001

        [finder]
        max_peers = 3
        static_nodes = ["{id}@10.0.0.1:8483"]
        check_interval_ms = 250
        max_concurrent_dials = 4

        [discovery]
        bootstrap_nodes = ["vnode://{id}@10.0.0.1:8483?tcp=8484"]
        request_timeout_ms = 500
        bucket_size = 8

        [consensus]
        producers = ["sbp_{addr}"]
        "#,
        seed = hex::encode([7u8; 32]),
        addr = hex::encode([9u8; 20]),
    );

    let config = NodeConfig::parse(&content).unwrap();
    assert_eq!(
        config.node_key().unwrap().public_key(),
        keypair(7).public_key()
    );
    assert_eq!(config.tcp_port().unwrap(), 9001);

    let finder = config.finder_config();
    assert_eq!(finder.max_peers, 3);
    assert_eq!(finder.max_concurrent_dials, 4);
    assert_eq!(finder.check_interval, Duration::from_millis(250));

    let discovery = config.discovery_config();
    assert_eq!(discovery.request_timeout, Duration::from_millis(500));
    assert_eq!(discovery.table.k, 8);

    let bootstrap = config.bootstrap_nodes().unwrap();
    assert_eq!(bootstrap[0].id, id);
    assert_eq!(bootstrap[0].tcp_port, 8484);

    assert_eq!(config.producers().unwrap().len(), 1);
}

#[test]
fn test_invalid_values_are_reported() {
    assert!(matches!(
        NodeConfig::parse("[node]\nlisten = 5"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        NodeConfig::parse("[nodes]\n"),
        Err(ConfigError::Parse(_))
    ));

    let config = NodeConfig::parse("[node]\nprivate_key = \"abcd\"").unwrap();
    assert!(matches!(
        config.node_key(),
        Err(ConfigError::Invalid {
            field: "node.private_key",
            ..
        })
    ));

    let config = NodeConfig::parse("[consensus]\nproducers = [\"nope\"]").unwrap();
    assert!(matches!(
        config.producers(),
        Err(ConfigError::Invalid {
            field: "consensus.producers",
            ..
        })
    ));
}

#[test]
fn test_load_missing_file() {
    assert!(matches!(
        NodeConfig::load("/nonexistent/sbp-node.toml"),
        Err(ConfigError::Io { .. })
    ));
}

// =============================================================================
// UDP TRANSPORT
// =============================================================================

async fn udp_node(seed: u8) -> (Arc<Discovery>, UdpTransport) {
    let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();
    let key = keypair(seed);
    let self_node = Node::from_socket_addr(NodeId::from_public_key(&key.public_key()), addr);
    let table = Arc::new(KademliaTable::new(self_node.id, Default::default()));
    let discovery = Arc::new(Discovery::new(
        key,
        self_node,
        table,
        Arc::new(transport.clone()),
        DiscoveryConfig::default(),
    ));
    (discovery, transport)
}

#[tokio::test]
async fn test_ping_over_real_sockets() {
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let (a, a_transport) = udp_node(1).await;
    let (b, b_transport) = udp_node(2).await;
    tokio::spawn(a_transport.run(Arc::clone(&a), shutdown_rx.clone()));
    tokio::spawn(b_transport.run(Arc::clone(&b), shutdown_rx));

    a.ping(b.self_node()).await.unwrap();
    assert_eq!(a.table().len(), 1);
    assert_eq!(b.table().len(), 1);

    shutdown_tx.send(true).unwrap();
}

#[tokio::test]
async fn test_oversize_send_is_refused() {
    let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let to = transport.local_addr().unwrap();
    assert_eq!(
        transport.send_packet(to, &[0u8; crate::wire::MAX_PACKET_LEN + 1]),
        Err(NetworkError::MessageTooLarge)
    );
}

// =============================================================================
// TCP CONNECTOR
// =============================================================================

#[tokio::test]
async fn test_tcp_connector_registers_session() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _accepted = listener.accept().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
    });

    let peers = Arc::new(PeerRegistry::new());
    let connector = TcpConnector::new(Arc::clone(&peers), Duration::from_secs(2));
    let mut target = node(3);
    target.ip = crate::domain::IpAddr::v4(127, 0, 0, 1);
    target.tcp_port = port;

    connector.connect_node(&target).await.unwrap();
    assert_eq!(peers.count_excluding_sbp(), 1);
    assert_eq!(
        connector.connect_node(&target).await,
        Err(ConnectError::AlreadyConnected)
    );
}

#[tokio::test]
async fn test_tcp_session_dropped_when_remote_closes() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (close_tx, close_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let (accepted, _) = listener.accept().await.unwrap();
        let _ = close_rx.await;
        drop(accepted);
    });

    let peers = Arc::new(PeerRegistry::new());
    let connector = TcpConnector::new(Arc::clone(&peers), Duration::from_secs(2));
    let mut target = node(5);
    target.ip = crate::domain::IpAddr::v4(127, 0, 0, 1);
    target.tcp_port = port;

    connector.connect_node(&target).await.unwrap();
    assert_eq!(peers.count_excluding_sbp(), 1);

    close_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        while peers.contains(&target.id) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session should be dropped after the remote closes");
    assert_eq!(peers.count_excluding_sbp(), 0);
    assert!(peers.is_empty());
}

#[tokio::test]
async fn test_tcp_connector_reports_refused() {
    // Bind then drop to obtain a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let peers = Arc::new(PeerRegistry::new());
    let connector = TcpConnector::new(Arc::clone(&peers), Duration::from_secs(2));
    let mut target = node(4);
    target.ip = crate::domain::IpAddr::v4(127, 0, 0, 1);
    target.tcp_port = port;

    assert!(connector.connect_node(&target).await.is_err());
    assert!(peers.is_empty());
}

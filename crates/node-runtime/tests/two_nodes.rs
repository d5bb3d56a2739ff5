//! Two runtimes on loopback find each other through a bootstrap node.

use std::sync::Arc;
use std::time::Duration;

use node_runtime::{build_self_node, NodeRuntime};
use peer_discovery::adapters::network::{NodeConfig, TcpConnector};
use peer_discovery::adapters::PeerRegistry;
use peer_discovery::ports::Connector;
use peer_discovery::{parse_node_ext, Address, NodeId};
use shared_crypto::Ed25519KeyPair;

const SEED_A: &str = "0101010101010101010101010101010101010101010101010101010101010101";
const SEED_B: &str = "0202020202020202020202020202020202020202020202020202020202020202";
const PRODUCER_B: &str = "0303030303030303030303030303030303030303030303030303030303030303";

fn config(body: &str) -> NodeConfig {
    NodeConfig::parse(body).unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nodes_discover_each_other_through_bootstrap() {
    let a_config = config(&format!(
        r#"
        [node]
        private_key = "{SEED_A}"
        listen = "127.0.0.1:0"
        "#
    ));
    let mut a = NodeRuntime::new(&a_config).await.unwrap();
    let a_addr = a.local_addr().unwrap();
    let a_id = a.discovery().id();
    a.start();

    let b_config = config(&format!(
        r#"
        [node]
        private_key = "{SEED_B}"
        producer_key = "{PRODUCER_B}"
        listen = "127.0.0.1:0"

        [discovery]
        bootstrap_nodes = ["{a_id}@{a_addr}"]
        request_timeout_ms = 500
        "#
    ));
    let mut b = NodeRuntime::new(&b_config).await.unwrap();
    let b_id = b.discovery().id();
    b.start();

    assert!(
        wait_until(|| {
            b.discovery()
                .table()
                .closest_to(&a_id, 1)
                .iter()
                .any(|n| n.id == a_id)
        })
        .await
    );

    // A learned B from its Ping, ownership proof included.
    let producer = Ed25519KeyPair::from_seed([3u8; 32]);
    let expected = Address::from_public_key(&producer.public_key());
    assert!(
        wait_until(|| {
            a.discovery()
                .table()
                .closest_to(&b_id, 1)
                .first()
                .and_then(parse_node_ext)
                == Some(expected)
        })
        .await
    );

    b.shutdown().await;
    a.shutdown().await;
}

#[tokio::test]
async fn test_runtime_rejects_bad_bootstrap_descriptor() {
    let bad = config(
        r#"
        [node]
        listen = "127.0.0.1:0"

        [discovery]
        bootstrap_nodes = ["not-a-node"]
        "#,
    );
    assert!(NodeRuntime::new(&bad).await.is_err());
}

#[tokio::test]
async fn test_session_listener_on_advertised_tcp_port_is_dialable() {
    let runtime = NodeRuntime::new(&config(
        r#"
        [node]
        listen = "127.0.0.1:0"
        "#,
    ))
    .await
    .unwrap();
    let advertised = runtime.discovery().self_node().clone();
    assert_eq!(advertised.tcp_port, runtime.local_addr().unwrap().port());

    // Sessions are served by whatever embeds the runtime
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", advertised.tcp_port))
        .await
        .unwrap();
    tokio::spawn(async move {
        let _session = listener.accept().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
    });

    let peers = Arc::new(PeerRegistry::new());
    let connector = TcpConnector::new(Arc::clone(&peers), Duration::from_secs(2));
    connector.connect_node(&advertised).await.unwrap();
    assert!(peers.contains(&advertised.id));
}

#[test]
fn test_self_node_carries_proof_only_for_validators() {
    let key = Ed25519KeyPair::from_seed([1u8; 32]);
    let owner = Ed25519KeyPair::from_seed([3u8; 32]);
    let udp = "127.0.0.1:8483".parse().unwrap();

    let plain = build_self_node(&key, None, udp, 8484);
    assert_eq!(plain.id, NodeId::from_public_key(&key.public_key()));
    assert_eq!(plain.tcp_port, 8484);
    assert!(plain.ext.is_empty());

    let validator = build_self_node(&key, Some(&owner), udp, 8484);
    assert_eq!(
        parse_node_ext(&validator),
        Some(Address::from_public_key(&owner.public_key()))
    );
}

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use shared_crypto::Ed25519KeyPair;
use thiserror::Error;

use crate::domain::{
    parse_node, Address, DiscoveryConfig, FinderConfig, Node, TableConfig,
};

/// Errors that can occur during config loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },
    /// TOML parsing error.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// A field parsed but holds an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Node configuration file.
///
/// Every field has a default, so an empty file is valid.
///
/// # Config File Format
///
/// ```toml
/// [node]
/// private_key = "<64 hex seed>"     # generated when absent
/// producer_key = "<64 hex seed>"    # validators only
/// listen = "0.0.0.0:8483"
/// tcp_port = 8484
/// dial_timeout_ms = 5000
///
/// [finder]
/// max_peers = 50
/// static_nodes = ["<id>@10.0.0.1:8483"]
/// check_interval_ms = 1000
/// max_concurrent_dials = 100
///
/// [discovery]
/// bootstrap_nodes = ["<id>@10.0.0.2:8483"]
/// request_timeout_ms = 3000
/// refresh_interval_secs = 30
/// bucket_size = 16
/// alpha = 3
///
/// [consensus]
/// producers = ["sbp_<40 hex>"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Identity and sockets
    pub node: NodeSection,
    /// Connection admission
    pub finder: FinderSection,
    /// Discovery protocol
    pub discovery: DiscoverySection,
    /// Producer set followed when no consensus engine is attached
    pub consensus: ConsensusSection,
}

/// `[node]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSection {
    /// Hex seed of the node key
    pub private_key: Option<String>,
    /// Hex seed of the validator key that signs our node ownership proof
    pub producer_key: Option<String>,
    /// UDP listen address, also advertised
    pub listen: String,
    /// Session port; defaults to the UDP port
    pub tcp_port: Option<u16>,
    /// TCP connect timeout
    pub dial_timeout_ms: u64,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            private_key: None,
            producer_key: None,
            listen: "0.0.0.0:8483".to_string(),
            tcp_port: None,
            dial_timeout_ms: 5_000,
        }
    }
}

/// `[finder]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinderSection {
    /// Peer ceiling
    pub max_peers: usize,
    /// Node descriptors dialled whenever under the ceiling
    pub static_nodes: Vec<String>,
    /// Reconciliation tick
    pub check_interval_ms: u64,
    /// Concurrent connection attempts; defaults to twice `max_peers`
    pub max_concurrent_dials: Option<usize>,
}

impl Default for FinderSection {
    fn default() -> Self {
        Self {
            max_peers: 50,
            static_nodes: Vec::new(),
            check_interval_ms: 1_000,
            max_concurrent_dials: None,
        }
    }
}

/// `[discovery]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySection {
    /// Node descriptors pinged at startup
    pub bootstrap_nodes: Vec<String>,
    /// Reply timeout
    pub request_timeout_ms: u64,
    /// Lookup period
    pub refresh_interval_secs: u64,
    /// Bucket capacity (k)
    pub bucket_size: usize,
    /// Lookup parallelism
    pub alpha: usize,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            bootstrap_nodes: Vec::new(),
            request_timeout_ms: 3_000,
            refresh_interval_secs: 30,
            bucket_size: 16,
            alpha: 3,
        }
    }
}

/// `[consensus]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsensusSection {
    /// Producer addresses
    pub producers: Vec<String>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The node key; a fresh one when none is configured.
    pub fn node_key(&self) -> Result<Ed25519KeyPair, ConfigError> {
        match &self.node.private_key {
            Some(seed) => parse_seed("node.private_key", seed),
            None => Ok(Ed25519KeyPair::generate()),
        }
    }

    /// The validator key, if this node belongs to one.
    pub fn producer_key(&self) -> Result<Option<Ed25519KeyPair>, ConfigError> {
        self.node
            .producer_key
            .as_deref()
            .map(|seed| parse_seed("node.producer_key", seed))
            .transpose()
    }

    /// UDP listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.node.listen.parse().map_err(|_| ConfigError::Invalid {
            field: "node.listen",
            reason: format!("{:?} is not ip:port", self.node.listen),
        })
    }

    /// Session port.
    pub fn tcp_port(&self) -> Result<u16, ConfigError> {
        Ok(self.node.tcp_port.unwrap_or(self.listen_addr()?.port()))
    }

    /// TCP connect timeout.
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.node.dial_timeout_ms)
    }

    /// Finder parameters.
    pub fn finder_config(&self) -> FinderConfig {
        let mut config = FinderConfig::with_max_peers(self.finder.max_peers);
        config.check_interval = Duration::from_millis(self.finder.check_interval_ms.max(1));
        if let Some(dials) = self.finder.max_concurrent_dials {
            config.max_concurrent_dials = dials.max(1);
        }
        config
    }

    /// Discovery parameters.
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            request_timeout: Duration::from_millis(self.discovery.request_timeout_ms),
            refresh_interval: Duration::from_secs(self.discovery.refresh_interval_secs.max(1)),
            table: TableConfig {
                k: self.discovery.bucket_size.max(1),
                alpha: self.discovery.alpha.max(1),
            },
        }
    }

    /// Parsed bootstrap nodes.
    pub fn bootstrap_nodes(&self) -> Result<Vec<Node>, ConfigError> {
        self.discovery
            .bootstrap_nodes
            .iter()
            .map(|s| {
                parse_node(s).map_err(|e| ConfigError::Invalid {
                    field: "discovery.bootstrap_nodes",
                    reason: format!("{s:?}: {e}"),
                })
            })
            .collect()
    }

    /// Parsed producer addresses.
    pub fn producers(&self) -> Result<Vec<Address>, ConfigError> {
        self.consensus
            .producers
            .iter()
            .map(|s| {
                s.parse().map_err(|e| ConfigError::Invalid {
                    field: "consensus.producers",
                    reason: format!("{s:?}: {e}"),
                })
            })
            .collect()
    }
}

fn parse_seed(field: &'static str, hex_seed: &str) -> Result<Ed25519KeyPair, ConfigError> {
    let bytes = hex::decode(hex_seed.trim()).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })?;
    let seed: [u8; 32] = bytes.try_into().map_err(|_| ConfigError::Invalid {
        field,
        reason: "seed must be 32 bytes".to_string(),
    })?;
    Ok(Ed25519KeyPair::from_seed(seed))
}

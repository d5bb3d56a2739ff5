//! Value Objects for Peer Discovery

use std::time::Duration;

/// Result of XOR distance calculation between two nodes
///
/// The distance is measured as the index of the first differing bit
/// when comparing two NodeIds via XOR. Range is 0-255 (for 256-bit NodeIds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance(pub u8);

impl Distance {
    /// Create a new Distance value
    pub fn new(bucket_index: u8) -> Self {
        Self(bucket_index)
    }

    /// Get the bucket index (0-255)
    pub fn bucket_index(&self) -> u8 {
        self.0
    }
}

/// Node table parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Bucket size (default: 16)
    pub k: usize,
    /// Nodes queried in parallel during a lookup (default: 3)
    pub alpha: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { k: 16, alpha: 3 }
    }
}

impl TableConfig {
    /// Create a config suitable for testing (smaller values)
    pub fn for_testing() -> Self {
        Self { k: 3, alpha: 2 }
    }
}

/// Connection admission parameters.
///
/// `max_peers` bounds connected non-SBP peers plus in-flight dials.
/// Connected SBP peers do not consume the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    /// Peer ceiling (default: 50)
    pub max_peers: usize,
    /// Reconciliation tick (default: 1s)
    pub check_interval: Duration,
    /// Concurrent connection attempts (default: 2 × max_peers)
    pub max_concurrent_dials: usize,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self::with_max_peers(50)
    }
}

impl FinderConfig {
    /// Defaults scaled to a given ceiling.
    pub fn with_max_peers(max_peers: usize) -> Self {
        Self {
            max_peers,
            check_interval: Duration::from_secs(1),
            max_concurrent_dials: (max_peers * 2).max(1),
        }
    }
}

/// Discovery request and refresh parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// How long to wait for a Pong / Neighbors reply (default: 3s)
    pub request_timeout: Duration,
    /// Interval between random-target lookups (default: 30s)
    pub refresh_interval: Duration,
    /// Node table parameters
    pub table: TableConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(3),
            refresh_interval: Duration::from_secs(30),
            table: TableConfig::default(),
        }
    }
}

//! Domain Errors for Peer Discovery

use thiserror::Error;

/// Errors raised while parsing a node descriptor string or a hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// No `@` between the node id and the endpoint
    #[error("missing '@' between node id and endpoint")]
    MissingSeparator,
    /// Node id is not 64 hex characters
    #[error("node id must be 64 hex characters")]
    InvalidNodeId,
    /// Endpoint is not `ip:port` / `[ipv6]:port`
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Unknown or malformed query parameter
    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),
    /// Address is not 20 bytes of hex
    #[error("address must be 40 hex characters, optionally prefixed by 'sbp_'")]
    InvalidAddress,
}

/// Errors that abort finder construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinderError {
    /// A configured static node could not be parsed
    #[error("invalid static node {descriptor:?}: {source}")]
    InvalidStaticNode {
        /// The offending configuration string
        descriptor: String,
        /// Why parsing failed
        source: DescriptorError,
    },
}

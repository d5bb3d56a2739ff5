//! Node descriptor strings.
//!
//! Grammar (used by static-node configuration and by `Display for Node`):
//!
//! ```text
//! [vnode://]<64 hex node id>@<ip>:<udp port>[?tcp=<tcp port>]
//! ```
//!
//! IPv6 endpoints are bracketed: `…@[2001:db8::1]:8483`. When `tcp` is
//! omitted the session port equals the discovery port. Descriptors carry no
//! extension data.

use std::fmt;
use std::str::FromStr;

use crate::domain::{DescriptorError, Node, NodeId};

/// Optional scheme prefix.
pub const SCHEME: &str = "vnode://";

/// Parse a node descriptor.
pub fn parse_node(descriptor: &str) -> Result<Node, DescriptorError> {
    let s = descriptor.trim();
    let s = s.strip_prefix(SCHEME).unwrap_or(s);

    let (id_part, rest) = s.split_once('@').ok_or(DescriptorError::MissingSeparator)?;
    let id: NodeId = id_part.parse()?;

    let (endpoint, query) = match rest.split_once('?') {
        Some((endpoint, query)) => (endpoint, Some(query)),
        None => (rest, None),
    };

    let addr: std::net::SocketAddr = endpoint
        .parse()
        .map_err(|_| DescriptorError::InvalidEndpoint(endpoint.to_string()))?;

    let mut node = Node::from_socket_addr(id, addr);

    if let Some(query) = query {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some(("tcp", port)) => {
                    node.tcp_port = port
                        .parse()
                        .map_err(|_| DescriptorError::InvalidQuery(pair.to_string()))?;
                }
                _ => return Err(DescriptorError::InvalidQuery(pair.to_string())),
            }
        }
    }

    Ok(node)
}

impl FromStr for Node {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_node(s)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.udp_addr())?;
        if self.tcp_port != self.udp_port {
            write!(f, "?tcp={}", self.tcp_port)?;
        }
        Ok(())
    }
}

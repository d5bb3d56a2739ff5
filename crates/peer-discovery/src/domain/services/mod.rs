//! Domain Services - Pure functions for Kademlia operations
//!
//! All functions in this module are pure (no I/O, no state mutation)
//! and deterministic (same inputs → same outputs).

mod distance;
mod sorting;

pub use distance::{bucket_for_node, xor_distance};
pub use sorting::{find_k_closest, sort_nodes_by_distance};

#[cfg(test)]
mod tests;

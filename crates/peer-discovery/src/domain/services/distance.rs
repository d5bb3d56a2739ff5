//! Kademlia distance calculations.

use crate::domain::{Distance, NodeId};

/// Calculate the XOR distance between two NodeIds
///
/// # Properties
/// - Symmetric: `xor_distance(a, b) == xor_distance(b, a)`
/// - Self is bucket 255 (closest)
///
/// # Returns
/// Index of the first differing bit (0-255). Higher values mean the nodes
/// share a longer prefix, i.e. are closer.
pub fn xor_distance(a: &NodeId, b: &NodeId) -> Distance {
    Distance::new(bucket_for_node(a, b) as u8)
}

/// Bucket index for `remote` in a table owned by `local`.
#[inline]
pub fn bucket_for_node(local: &NodeId, remote: &NodeId) -> usize {
    let local_bytes = local.as_bytes();
    let remote_bytes = remote.as_bytes();

    for i in 0..32 {
        let xor = local_bytes[i] ^ remote_bytes[i];
        if xor != 0 {
            return i * 8 + xor.leading_zeros() as usize;
        }
    }

    // Identical nodes
    255
}

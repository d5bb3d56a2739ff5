//! Validator ownership proof carried in `Node::ext`.
//!
//! Layout: `owner_public_key (32) ++ Sign(owner_key, node_id) (64)`.
//! A node whose proof verifies is operated by the address derived from
//! `owner_public_key`. Anything else is an ordinary node, never an error.

use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

use crate::domain::{Address, Node};

/// Length of a well-formed ownership proof.
pub const EXT_LEN: usize = 32 + 64;

/// Attach an ownership proof by `owner` to `node`.
///
/// Any previous extension is replaced.
#[must_use]
pub fn set_node_ext(owner: &Ed25519KeyPair, node: Node) -> Node {
    let mut ext = Vec::with_capacity(EXT_LEN);
    ext.extend_from_slice(owner.public_key().as_bytes());
    ext.extend_from_slice(owner.sign(node.id.as_bytes()).as_bytes());
    node.with_ext(ext)
}

/// Recover the validator address proven by `node.ext`.
///
/// Returns `None` for truncated, absent or forged proofs.
pub fn parse_node_ext(node: &Node) -> Option<Address> {
    if node.ext.len() < EXT_LEN {
        return None;
    }

    let owner = Ed25519PublicKey::from_slice(&node.ext[..32]).ok()?;
    let signature = Ed25519Signature::from_slice(&node.ext[32..EXT_LEN]).ok()?;
    owner.verify(node.id.as_bytes(), &signature).ok()?;

    Some(Address::from_public_key(&owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IpAddr, NodeId};

    fn node(seed: u8) -> Node {
        let key = Ed25519KeyPair::from_seed([seed; 32]);
        Node::new(
            NodeId::from_public_key(&key.public_key()),
            IpAddr::v4(10, 0, 0, seed),
            8483,
            8483,
        )
    }

    #[test]
    fn test_ext_roundtrip_recovers_owner_address() {
        for seed in 1..8u8 {
            let owner = Ed25519KeyPair::from_seed([seed.wrapping_mul(31); 32]);
            let signed = set_node_ext(&owner, node(seed));

            assert_eq!(signed.ext.len(), EXT_LEN);
            assert_eq!(
                parse_node_ext(&signed),
                Some(Address::from_public_key(&owner.public_key()))
            );
        }
    }

    #[test]
    fn test_absent_ext_is_not_a_validator() {
        assert_eq!(parse_node_ext(&node(1)), None);
    }

    #[test]
    fn test_truncated_ext_is_not_a_validator() {
        let owner = Ed25519KeyPair::from_seed([9; 32]);
        let mut signed = set_node_ext(&owner, node(1));
        signed.ext.truncate(EXT_LEN - 1);

        assert_eq!(parse_node_ext(&signed), None);
    }

    #[test]
    fn test_proof_bound_to_node_id() {
        let owner = Ed25519KeyPair::from_seed([9; 32]);
        let signed = set_node_ext(&owner, node(1));

        // Same proof transplanted onto another node must not verify
        let stolen = node(2).with_ext(signed.ext.clone());
        assert_eq!(parse_node_ext(&stolen), None);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let owner = Ed25519KeyPair::from_seed([9; 32]);
        let mut signed = set_node_ext(&owner, node(1));
        signed.ext[40] ^= 0x01;

        assert_eq!(parse_node_ext(&signed), None);
    }
}

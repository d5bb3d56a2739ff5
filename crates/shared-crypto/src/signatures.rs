//! # Ed25519 Signatures
//!
//! Twisted Edwards curve signatures with deterministic nonces. A node's
//! discovery identity is its Ed25519 public key.

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes, rejecting encodings that are not curve points.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from a slice that must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Self::from_bytes(arr)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from a slice that must be exactly 64 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(arr))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// Ed25519 keypair.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_proof_over_node_id_verifies() {
        let owner = Ed25519KeyPair::from_seed([7u8; 32]);
        let node_id = [0x42u8; 32];

        let proof = owner.sign(&node_id);
        assert!(owner.public_key().verify(&node_id, &proof).is_ok());

        let mut other_id = node_id;
        other_id[31] ^= 1;
        assert_eq!(
            owner.public_key().verify(&other_id, &proof),
            Err(CryptoError::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_proof_from_another_owner_is_rejected() {
        let owner = Ed25519KeyPair::from_seed([1u8; 32]);
        let impostor = Ed25519KeyPair::from_seed([2u8; 32]);
        let node_id = [9u8; 32];

        let forged = impostor.sign(&node_id);
        assert!(owner.public_key().verify(&node_id, &forged).is_err());
    }

    #[test]
    fn test_flipped_signature_bit_is_rejected() {
        let key = Ed25519KeyPair::generate();
        let checksum = [0x5au8; 32];

        let mut bytes = *key.sign(&checksum).as_bytes();
        bytes[0] ^= 0x80;
        let tampered = Ed25519Signature::from_bytes(bytes);
        assert!(key.public_key().verify(&checksum, &tampered).is_err());
    }

    #[test]
    fn test_restored_key_signs_identically() {
        let node_key = Ed25519KeyPair::generate();
        let restored = Ed25519KeyPair::from_seed(node_key.to_seed());

        assert_eq!(restored.public_key(), node_key.public_key());
        assert_eq!(restored.sign(b"sbp"), node_key.sign(b"sbp"));
    }

    #[test]
    fn test_wire_bytes_reparse() {
        let key = Ed25519KeyPair::from_seed([3u8; 32]);
        let signature = key.sign(b"neighbors");

        let public = Ed25519PublicKey::from_slice(key.public_key().as_bytes()).unwrap();
        let parsed = Ed25519Signature::from_slice(signature.as_bytes()).unwrap();
        assert!(public.verify(b"neighbors", &parsed).is_ok());
    }

    #[test]
    fn test_from_slice_rejects_bad_lengths() {
        assert!(matches!(
            Ed25519PublicKey::from_slice(&[0u8; 31]),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 31 })
        ));
        assert_eq!(
            Ed25519Signature::from_slice(&[0u8; 63]),
            Err(CryptoError::InvalidSignatureFormat)
        );
    }
}

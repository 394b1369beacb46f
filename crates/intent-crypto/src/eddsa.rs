//! Ed25519 identity keys and `did:key` derivation.

use crate::error::CryptoError;
use ed25519_dalek::{Keypair, PublicKey as DalekPublicKey, SecretKey as DalekSecretKey, Signer, Verifier};
use rand_core_05::OsRng;
use zeroize::Zeroize;

/// The `did:key` multicodec prefix for Ed25519 public keys (varint-encoded
/// `0xed01`).
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// An Ed25519 keypair, with the secret key zeroized on drop.
pub struct Ed25519KeyPair {
    keypair: Keypair,
}

impl Ed25519KeyPair {
    /// Generates a fresh keypair from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = OsRng {};
        Self {
            keypair: Keypair::generate(&mut csprng),
        }
    }

    /// Reconstructs a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        if seed.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 32-byte Ed25519 seed, got {} bytes",
                seed.len()
            )));
        }
        let secret = DalekSecretKey::from_bytes(seed)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public = DalekPublicKey::from(&secret);
        Ok(Self {
            keypair: Keypair { secret, public },
        })
    }

    /// The 32-byte private seed. Callers must not persist this in plaintext.
    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.keypair.secret.to_bytes()
    }

    /// The 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.keypair.public.to_bytes()
    }

    /// Signs `message`, returning the raw 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.keypair.sign(message).to_bytes()
    }

    /// Verifies a raw 64-byte Ed25519 signature against this keypair's
    /// public key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        verify(&self.public_key_bytes(), message, signature)
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        let mut seed = self.keypair.secret.to_bytes();
        seed.zeroize();
    }
}

/// Generates a fresh Ed25519 keypair, returning `(private_seed, public_key)`.
pub fn generate_ed25519_keypair() -> ([u8; 32], [u8; 32]) {
    let kp = Ed25519KeyPair::generate();
    (kp.private_key_bytes(), kp.public_key_bytes())
}

/// Verifies a detached Ed25519 signature.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let public = DalekPublicKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let sig = ed25519_dalek::Signature::from_bytes(signature)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    public
        .verify(message, &sig)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Derives the `did:key` identifier for an Ed25519 public key:
/// `did:key:z` + base58btc(multicodec-prefix ‖ public_key).
///
/// Deterministic: the same public key always yields the same DID, and
/// distinct public keys never collide (base58 over a prefix-tagged,
/// fixed-length input is injective).
pub fn derive_did(public_key: &[u8; 32]) -> String {
    let mut tagged = Vec::with_capacity(2 + 32);
    tagged.extend_from_slice(&ED25519_MULTICODEC);
    tagged.extend_from_slice(public_key);
    format!("did:key:z{}", bs58::encode(tagged).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_did_of_all_zero_key_starts_with_expected_prefix() {
        let zero_key = [0u8; 32];
        let did = derive_did(&zero_key);
        assert!(did.starts_with("did:key:z1"));

        let mut tagged = ED25519_MULTICODEC.to_vec();
        tagged.extend_from_slice(&zero_key);
        let expected = format!("did:key:z{}", bs58::encode(tagged).into_string());
        assert_eq!(did, expected);
    }

    #[test]
    fn derive_did_is_deterministic() {
        let (_, pk) = generate_ed25519_keypair();
        assert_eq!(derive_did(&pk), derive_did(&pk));
    }

    #[test]
    fn distinct_keys_yield_distinct_dids() {
        let (_, pk1) = generate_ed25519_keypair();
        let (_, pk2) = generate_ed25519_keypair();
        assert_ne!(derive_did(&pk1), derive_did(&pk2));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign(b"hello intent layer");
        assert!(kp.verify(b"hello intent layer", &sig).is_ok());
        assert!(kp.verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn from_seed_reproduces_same_public_key() {
        let kp = Ed25519KeyPair::generate();
        let seed = kp.private_key_bytes();
        let rebuilt = Ed25519KeyPair::from_seed(&seed).unwrap();
        assert_eq!(kp.public_key_bytes(), rebuilt.public_key_bytes());
    }
}

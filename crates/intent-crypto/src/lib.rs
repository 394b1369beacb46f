//! Cryptographic primitives for the intent layer SDK: Ed25519 identity keys
//! and `did:key` derivation, a deterministic secp256k1 ledger signer derived
//! from the same seed, and envelope-at-rest encryption for the key store.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod aead;
pub mod eddsa;
pub mod error;
pub mod hash;
pub mod secp;

pub use aead::{decrypt, encrypt, get_encryption_key};
pub use eddsa::{derive_did, generate_ed25519_keypair, verify, Ed25519KeyPair};
pub use error::{CryptoError, ErrorCode};
pub use hash::{keccak256, sha256, sha256_hex};
pub use secp::{Address, LocalSigner, Signer};

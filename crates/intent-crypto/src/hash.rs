//! Shared hash primitives used by envelope canonicalization and on-chain
//! content addressing.

use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// SHA-256 digest, returned as lowercase hex — used for `prompt_sha256`.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(digest)
}

/// Raw SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Keccak-256 digest, used for the on-chain envelope hash and for Ethereum
/// address derivation.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_string_matches_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn keccak256_of_empty_input_matches_known_vector() {
        let got = keccak256(b"");
        assert_eq!(
            hex::encode(got),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}

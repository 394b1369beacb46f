//! Hand-rolled Solidity ABI encode/decode for the three contract calls this
//! client ever issues. Not a general-purpose codec — just enough to build
//! `recordIntent`, `resolve`, `register`, and `minStakeWei` calldata and
//! read back their results.

use intent_crypto::hash::keccak256;

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn pad32(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let remainder = out.len() % 32;
    if remainder != 0 {
        out.extend(std::iter::repeat(0u8).take(32 - remainder));
    }
    out
}

fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + data.len());
    let mut len_word = [0u8; 32];
    len_word[24..].copy_from_slice(&(data.len() as u64).to_be_bytes());
    out.extend_from_slice(&len_word);
    out.extend_from_slice(&pad32(data));
    out
}

/// `recordIntent(bytes32 envelopeHash, bytes cid)`.
pub fn encode_record_intent(envelope_hash: &[u8; 32], cid: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&selector("recordIntent(bytes32,bytes)"));
    out.extend_from_slice(envelope_hash);
    let mut offset = [0u8; 32];
    offset[31] = 0x40;
    out.extend_from_slice(&offset);
    out.extend_from_slice(&encode_dynamic_bytes(cid));
    out
}

/// `resolve(string did)`.
pub fn encode_resolve(did: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&selector("resolve(string)"));
    let mut offset = [0u8; 32];
    offset[31] = 0x20;
    out.extend_from_slice(&offset);
    out.extend_from_slice(&encode_dynamic_bytes(did.as_bytes()));
    out
}

/// `register(string did)`.
pub fn encode_register(did: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&selector("register(string)"));
    let mut offset = [0u8; 32];
    offset[31] = 0x20;
    out.extend_from_slice(&offset);
    out.extend_from_slice(&encode_dynamic_bytes(did.as_bytes()));
    out
}

/// `minStakeWei()`.
pub fn encode_min_stake_wei() -> Vec<u8> {
    selector("minStakeWei()").to_vec()
}

/// Decodes a `resolve` return value: `(address owner, bool active)`,
/// each ABI-encoded as a left-padded 32-byte word.
pub fn decode_resolve_result(output: &[u8]) -> Option<([u8; 20], bool)> {
    if output.len() < 64 {
        return None;
    }
    let mut owner = [0u8; 20];
    owner.copy_from_slice(&output[12..32]);
    let active = output[32..64].iter().any(|&b| b != 0);
    Some((owner, active))
}

/// Decodes a single `uint256` return value to its minimal big-endian
/// representation (no leading zero bytes; zero decodes to an empty
/// vector, matching the RLP integer convention used by [`crate::tx`]).
pub fn decode_uint256(output: &[u8]) -> Vec<u8> {
    let word = if output.len() >= 32 { &output[..32] } else { output };
    let first_nonzero = word.iter().position(|&b| b != 0);
    match first_nonzero {
        Some(idx) => word[idx..].to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_intent_layout_has_selector_hash_then_dynamic_bytes() {
        let hash = [0x11u8; 32];
        let encoded = encode_record_intent(&hash, b"cid-bytes");
        assert_eq!(&encoded[0..4], &selector("recordIntent(bytes32,bytes)"));
        assert_eq!(&encoded[4..36], &hash);
        // offset word points at byte 0x40 past the first two head slots
        assert_eq!(encoded[36 + 31], 0x40);
    }

    #[test]
    fn resolve_roundtrips_owner_and_active_flag() {
        let mut output = vec![0u8; 64];
        output[12..32].copy_from_slice(&[0xabu8; 20]);
        output[63] = 1;
        let (owner, active) = decode_resolve_result(&output).unwrap();
        assert_eq!(owner, [0xabu8; 20]);
        assert!(active);
    }

    #[test]
    fn decode_uint256_strips_leading_zero_bytes() {
        let mut output = [0u8; 32];
        output[30] = 0x01;
        output[31] = 0x00;
        assert_eq!(decode_uint256(&output), vec![0x01, 0x00]);
    }

    #[test]
    fn decode_uint256_of_zero_is_empty() {
        assert_eq!(decode_uint256(&[0u8; 32]), Vec::<u8>::new());
    }
}

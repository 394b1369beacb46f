//! Legacy (pre-EIP-1559) transaction assembly: RLP encoding, signing
//! digest, and the final signed wire form, grounded in the same
//! nine-field layout every EVM-compatible chain still accepts.

use intent_crypto::hash::keccak256;
use intent_crypto::secp::{Address, Signer};
use rlp::RlpStream;

/// Strips leading zero bytes so the value matches RLP's minimal-length
/// integer encoding; an all-zero input becomes an empty vector.
pub fn trim_be(bytes: &[u8]) -> Vec<u8> {
    let first_nonzero = bytes.iter().position(|&b| b != 0);
    match first_nonzero {
        Some(idx) => bytes[idx..].to_vec(),
        None => Vec::new(),
    }
}

pub fn wei_from_u128(value: u128) -> Vec<u8> {
    trim_be(&value.to_be_bytes())
}

pub fn wei_to_hex(wei: &[u8]) -> String {
    if wei.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", hex::encode(wei))
    }
}

/// An unsigned legacy transaction. `value`/`gas_price` are minimal-length
/// big-endian byte strings rather than native integers, since contract
/// stake amounts are not guaranteed to fit in a `u128`.
#[derive(Debug, Clone)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: Vec<u8>,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: Vec<u8>,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn append_open_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(address) => {
                stream.append(&address.to_vec());
            }
            None => {
                stream.append_empty_data();
            }
        }
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// The EIP-155 signing preimage: the RLP-encoded open fields with
    /// `(chain_id, 0, 0)` appended in place of a signature. This is what
    /// gets keccak256'd and signed, not the digest itself — the signer
    /// owns the hashing step so it never has to trust a caller-supplied
    /// digest.
    fn signing_preimage(&self, chain_id: u64) -> Vec<u8> {
        let mut stream = RlpStream::new();
        stream.begin_list(9);
        self.append_open_fields(&mut stream);
        stream.append(&chain_id);
        stream.append_empty_data();
        stream.append_empty_data();
        stream.out().to_vec()
    }

    #[cfg(test)]
    fn signing_digest(&self, chain_id: u64) -> [u8; 32] {
        keccak256(&self.signing_preimage(chain_id))
    }

    /// Signs via `signer` and returns the final RLP-encoded, broadcastable
    /// transaction bytes.
    pub fn sign(&self, signer: &dyn Signer, chain_id: u64) -> Result<Vec<u8>, intent_crypto::error::CryptoError> {
        let preimage = self.signing_preimage(chain_id);
        let packed = signer.sign_transaction(&preimage)?;
        let (v, r, s) = unpack_signature(&packed)?;

        let mut stream = RlpStream::new();
        stream.begin_list(9);
        self.append_open_fields(&mut stream);
        stream.append(&v);
        stream.append(&r);
        stream.append(&s);
        Ok(stream.out().to_vec())
    }
}

/// Splits the `[v_len | v_bytes | r(32) | s(32)]` layout `LocalSigner`
/// packs its signatures into.
fn unpack_signature(packed: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), intent_crypto::error::CryptoError> {
    use intent_crypto::error::CryptoError;

    let v_len = *packed.first().ok_or_else(|| CryptoError::OperationFailed("empty signature".into()))? as usize;
    if packed.len() != 1 + v_len + 64 {
        return Err(CryptoError::OperationFailed("malformed packed signature".into()));
    }
    let v = packed[1..1 + v_len].to_vec();
    let r = trim_be(&packed[1 + v_len..1 + v_len + 32]);
    let s = trim_be(&packed[1 + v_len + 32..1 + v_len + 64]);
    Ok((v, r, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_crypto::secp::LocalSigner;

    fn sample_tx() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 3,
            gas_price: wei_from_u128(1_000_000_000),
            gas_limit: 300_000,
            to: Some([0xaa; 20]),
            value: wei_from_u128(10_000_000_000_000_000),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        }
    }

    #[test]
    fn signing_digest_is_deterministic() {
        let tx = sample_tx();
        assert_eq!(tx.signing_digest(11155111), tx.signing_digest(11155111));
    }

    #[test]
    fn signing_digest_changes_with_chain_id() {
        let tx = sample_tx();
        assert_ne!(tx.signing_digest(1), tx.signing_digest(11155111));
    }

    #[test]
    fn signed_transaction_round_trips_through_rlp_decoding() {
        let signer = LocalSigner::from_ed25519_seed(&[4u8; 32], 11155111).unwrap();
        let tx = sample_tx();
        let signed = tx.sign(&signer, 11155111).unwrap();

        let rlp = rlp::Rlp::new(&signed);
        assert_eq!(rlp.item_count().unwrap(), 9);
        let nonce: u64 = rlp.val_at(0).unwrap();
        assert_eq!(nonce, 3);
    }

    #[test]
    fn trim_be_collapses_all_zero_input_to_empty() {
        assert_eq!(trim_be(&[0u8; 4]), Vec::<u8>::new());
    }
}

//! The signed call envelope: schema, canonicalization, hashing, and
//! signing.

use crate::error::EnvelopeError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use intent_crypto::{eddsa::Ed25519KeyPair, hash::keccak256, sha256_hex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// A signed commitment to a single model invocation.
///
/// `metadata` is carried for the caller's own bookkeeping and is excluded
/// from the signature; it is excluded from the on-chain hash as well (see
/// [`CallEnvelope::hash`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallEnvelope {
    pub did: String,
    pub model_id: String,
    pub tool_id: String,
    pub prompt_sha256: String,
    pub timestamp_ms: i64,
    pub stake_wei: String,
    pub sig_ed25519: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Constructs envelopes incrementally. Kept `#[non_exhaustive]`-shaped via
/// private fields so new, signature-irrelevant metadata can be added to
/// `CallEnvelope` later without a breaking change to callers who only
/// construct through this builder.
pub struct CallEnvelopeBuilder {
    prompt: String,
    model_id: String,
    tool_id: String,
    did: String,
    stake_wei: String,
    timestamp_ms: Option<i64>,
    metadata: Option<Value>,
}

impl CallEnvelopeBuilder {
    pub fn new(
        prompt: impl Into<String>,
        model_id: impl Into<String>,
        tool_id: impl Into<String>,
        did: impl Into<String>,
        stake_wei: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model_id: model_id.into(),
            tool_id: tool_id.into(),
            did: did.into(),
            stake_wei: stake_wei.into(),
            timestamp_ms: None,
            metadata: None,
        }
    }

    pub fn timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Builds and signs the envelope with `keypair`, validating every
    /// field first.
    pub fn build_and_sign(self, keypair: &Ed25519KeyPair) -> Result<CallEnvelope, EnvelopeError> {
        if self.model_id.is_empty() {
            return Err(EnvelopeError::EmptyField("model_id"));
        }
        if self.tool_id.is_empty() {
            return Err(EnvelopeError::EmptyField("tool_id"));
        }
        if !self.did.starts_with("did:") {
            return Err(EnvelopeError::EmptyField("did"));
        }

        let timestamp_ms = self.timestamp_ms.unwrap_or_else(now_ms);
        let prompt_sha256 = sha256_hex(self.prompt.as_bytes());

        let mut envelope = CallEnvelope {
            did: self.did,
            model_id: self.model_id,
            tool_id: self.tool_id,
            prompt_sha256,
            timestamp_ms,
            stake_wei: self.stake_wei,
            sig_ed25519: String::new(),
            metadata: self.metadata,
        };

        let signable = to_signable_json(&envelope)?;
        let signature = keypair.sign(signable.as_bytes());
        envelope.sig_ed25519 = URL_SAFE_NO_PAD.encode(signature);
        Ok(envelope)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Serializes `envelope` to a `serde_json::Value`, then strips the named
/// top-level keys before canonicalizing. Both [`to_signable_json`] and
/// [`to_hashable_json`] go through this so their exclusion sets can never
/// silently drift apart.
fn to_canonical_json_excluding(
    envelope: &CallEnvelope,
    exclude: &[&str],
) -> Result<String, EnvelopeError> {
    let value = serde_json::to_value(envelope)
        .map_err(|e| EnvelopeError::Canonicalization(e.to_string()))?;
    let mut map = match value {
        Value::Object(m) => m,
        _ => unreachable!("CallEnvelope always serializes to a JSON object"),
    };
    for key in exclude {
        map.remove(*key);
    }
    let pruned = Value::Object(map);
    serde_jcs::to_string(&pruned).map_err(|e| EnvelopeError::Canonicalization(e.to_string()))
}

/// Canonical JSON over the envelope minus `sig_ed25519` and `metadata` —
/// the exact bytes that get Ed25519-signed.
pub fn to_signable_json(envelope: &CallEnvelope) -> Result<String, EnvelopeError> {
    to_canonical_json_excluding(envelope, &["sig_ed25519", "metadata"])
}

/// Canonical JSON over the envelope minus `metadata` only. `sig_ed25519`
/// is retained, matching the reference behavior this hash must
/// bit-exactly reproduce for on-chain records to match.
pub fn to_hashable_json(envelope: &CallEnvelope) -> Result<String, EnvelopeError> {
    to_canonical_json_excluding(envelope, &["metadata"])
}

impl CallEnvelope {
    /// The 32-byte keccak256 hash submitted on-chain. Identical regardless
    /// of the `metadata` field's presence or contents.
    pub fn hash(&self) -> Result<[u8; 32], EnvelopeError> {
        let canonical = to_hashable_json(self)?;
        Ok(keccak256(canonical.as_bytes()))
    }

    /// Verifies the envelope's own signature against the embedded `did`'s
    /// public key (caller-supplied, since the envelope does not carry a
    /// raw public key field).
    pub fn verify_signature(&self, public_key: &[u8; 32]) -> Result<(), EnvelopeError> {
        let signable = to_signable_json(self)?;
        let signature = URL_SAFE_NO_PAD
            .decode(&self.sig_ed25519)
            .map_err(|e| EnvelopeError::Signing(e.to_string()))?;
        intent_crypto::eddsa::verify(public_key, signable.as_bytes(), &signature)
            .map_err(|e| EnvelopeError::Signing(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if !self.did.starts_with("did:") {
            return Err(EnvelopeError::EmptyField("did"));
        }
        if self.model_id.is_empty() {
            return Err(EnvelopeError::EmptyField("model_id"));
        }
        if self.tool_id.is_empty() {
            return Err(EnvelopeError::EmptyField("tool_id"));
        }
        if self.prompt_sha256.len() != 64 || !self.prompt_sha256.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(EnvelopeError::InvalidHash(self.prompt_sha256.clone()));
        }
        Ok(())
    }
}

/// Normalizes a hex-encoded hash (with or without a `0x` prefix) to 32 raw
/// bytes.
pub fn normalize_hash_bytes(input: &str) -> Result<[u8; 32], EnvelopeError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(stripped).map_err(|_| EnvelopeError::InvalidHash(input.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| EnvelopeError::InvalidHash(input.to_string()))
}

/// Decodes a content ID to raw bytes: hex (with/without `0x`) first,
/// base58 second, and UTF-8 only when explicitly permitted.
pub fn ipfs_cid_to_bytes(cid: &str, allow_utf8_fallback: bool) -> Result<Vec<u8>, EnvelopeError> {
    let stripped = cid.strip_prefix("0x").unwrap_or(cid);
    if stripped.len() == 64 && stripped.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(stripped).map_err(|e| EnvelopeError::InvalidCid(e.to_string()));
    }
    if let Ok(decoded) = bs58::decode(cid).into_vec() {
        return Ok(decoded);
    }
    if allow_utf8_fallback {
        return Ok(cid.as_bytes().to_vec());
    }
    Err(EnvelopeError::InvalidCid(cid.to_string()))
}

/// Strips `sig_ed25519` and prompt-shaped fields from a JSON value before
/// logging, replacing each with a length-tagged placeholder.
pub fn redact_for_log(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        redact_key(map, "sig_ed25519");
        redact_key(map, "prompt");
    }
    value
}

fn redact_key(map: &mut Map<String, Value>, key: &str) {
    if let Some(existing) = map.get(key) {
        let len = existing.as_str().map(|s| s.len()).unwrap_or(0);
        map.insert(key.to_string(), Value::String(format!("[REDACTED - {len} chars]")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_crypto::eddsa::Ed25519KeyPair;

    fn signed_envelope(metadata: Option<Value>) -> CallEnvelope {
        let keypair = Ed25519KeyPair::from_seed(&[1u8; 32]).unwrap();
        let mut builder = CallEnvelopeBuilder::new(
            "",
            "gpt-4o@2025-03-12",
            "openai.chat",
            "did:key:zABC",
            "10000000000000000",
        )
        .timestamp_ms(1711234567890);
        if let Some(m) = metadata {
            builder = builder.metadata(m);
        }
        builder.build_and_sign(&keypair).unwrap()
    }

    #[test]
    fn prompt_hash_of_empty_string_matches_known_vector() {
        let envelope = signed_envelope(None);
        assert_eq!(
            envelope.prompt_sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_is_unaffected_by_metadata() {
        let without_metadata = signed_envelope(None);
        let with_metadata = CallEnvelope {
            metadata: Some(serde_json::json!({"x": 1})),
            ..without_metadata.clone()
        };
        assert_eq!(without_metadata.hash().unwrap(), with_metadata.hash().unwrap());
    }

    #[test]
    fn canonical_json_is_stable_across_calls() {
        let envelope = signed_envelope(Some(serde_json::json!({"a": 1, "b": 2})));
        assert_eq!(
            to_hashable_json(&envelope).unwrap(),
            to_hashable_json(&envelope).unwrap()
        );
    }

    #[test]
    fn signature_round_trips() {
        let keypair = Ed25519KeyPair::from_seed(&[2u8; 32]).unwrap();
        let envelope = CallEnvelopeBuilder::new(
            "hello",
            "gpt-4o",
            "tool",
            "did:key:zXYZ",
            "0",
        )
        .build_and_sign(&keypair)
        .unwrap();
        assert!(envelope.verify_signature(&keypair.public_key_bytes()).is_ok());
    }

    #[test]
    fn validate_rejects_malformed_did() {
        let mut envelope = signed_envelope(None);
        envelope.did = "not-a-did".to_string();
        assert!(envelope.validate().is_err());
    }

    #[test]
    fn ipfs_cid_to_bytes_prefers_hex() {
        let hex_cid = "a".repeat(64);
        let bytes = ipfs_cid_to_bytes(&hex_cid, false).unwrap();
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn ipfs_cid_to_bytes_rejects_arbitrary_text_without_fallback() {
        assert!(ipfs_cid_to_bytes("not a cid at all!!", false).is_err());
    }

    #[test]
    fn redact_for_log_hides_signature_and_prompt() {
        let value = serde_json::json!({"sig_ed25519": "abcd", "prompt": "secret prompt", "model_id": "gpt-4o"});
        let redacted = redact_for_log(value);
        assert_eq!(redacted["sig_ed25519"], "[REDACTED - 4 chars]");
        assert_eq!(redacted["model_id"], "gpt-4o");
    }
}

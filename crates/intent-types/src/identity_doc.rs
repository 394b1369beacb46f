//! Wire types exchanged with the Gateway: the DID document submitted for
//! registration and the transaction receipt returned in response.

use crate::error::RegisterError;
use serde::{Deserialize, Serialize};

fn default_schema_version() -> u32 {
    2
}

/// The document registered with the Gateway for a single DID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DidDocument {
    pub did: String,
    #[serde(with = "hex_bytes")]
    pub pub_key: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_cid: Option<String>,
}

impl DidDocument {
    pub fn new(did: impl Into<String>, pub_key: Vec<u8>) -> Self {
        Self {
            did: did.into(),
            pub_key,
            org_id: None,
            label: None,
            schema_version: default_schema_version(),
            doc_cid: None,
            payload_cid: None,
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

/// The Gateway's reply to a registration attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxReceipt {
    pub hash: String,
    pub gas_used: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub error_code: RegisterError,
}

impl TxReceipt {
    /// `success=true` must always pair with an unset error code.
    pub fn is_internally_consistent(&self) -> bool {
        if self.success {
            self.error_code == RegisterError::UnknownUnspecified
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_receipt_with_nonzero_error_code_is_inconsistent() {
        let receipt = TxReceipt {
            hash: "0x0".repeat(1),
            gas_used: 21000,
            success: true,
            error: None,
            error_code: RegisterError::InvalidDid,
        };
        assert!(!receipt.is_internally_consistent());
    }

    #[test]
    fn did_document_round_trips_through_json() {
        let doc = DidDocument::new("did:key:zABC", vec![1, 2, 3, 4]);
        let json = serde_json::to_string(&doc).unwrap();
        let back: DidDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }
}

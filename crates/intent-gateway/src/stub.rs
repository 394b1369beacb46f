//! The offline stub transport: a deterministic double usable both in
//! tests and as a production fallback when the proto/gRPC stack is
//! unavailable.

use crate::transport::{GatewayCredentials, Transport};
use async_trait::async_trait;
use intent_types::error::{GatewayError, RegisterError};
use intent_types::{DidDocument, TxReceipt};
use std::time::Duration;

#[derive(Default)]
pub struct StubTransport {
    initialized: bool,
}

#[async_trait]
impl Transport for StubTransport {
    async fn initialize(&mut self, _url: &str, _verify_tls: bool) -> Result<(), GatewayError> {
        self.initialized = true;
        Ok(())
    }

    async fn register_did(
        &self,
        document: &DidDocument,
        _timeout: Duration,
        _credentials: &GatewayCredentials,
    ) -> Result<TxReceipt, GatewayError> {
        tokio::time::sleep(Duration::from_millis(100)).await;

        if document.did.len() < 10 {
            return Ok(TxReceipt {
                hash: format!("0x{}", "0".repeat(64)),
                gas_used: 0,
                success: false,
                error: Some("did is too short".into()),
                error_code: RegisterError::InvalidDid,
            });
        }
        if document.did == "did:key:already_registered" {
            return Ok(TxReceipt {
                hash: format!("0x{}", "0".repeat(64)),
                gas_used: 0,
                success: false,
                error: Some("already registered".into()),
                error_code: RegisterError::AlreadyRegistered,
            });
        }
        if document.org_id.as_deref() == Some("quota_exceeded") {
            return Err(GatewayError::QuotaExceeded);
        }

        Ok(TxReceipt {
            hash: format!("0x{}", "0".repeat(64)),
            gas_used: 21_000,
            success: true,
            error: None,
            error_code: RegisterError::UnknownUnspecified,
        })
    }

    async fn close(&mut self) {
        self.initialized = false;
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(did: &str) -> DidDocument {
        DidDocument::new(did, vec![1, 2, 3])
    }

    #[tokio::test]
    async fn short_did_is_rejected() {
        let transport = StubTransport::default();
        let receipt = transport
            .register_did(&doc("short"), Duration::from_secs(1), &GatewayCredentials::default())
            .await
            .unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.error_code, RegisterError::InvalidDid);
    }

    #[tokio::test]
    async fn already_registered_sentinel_did_returns_error_code() {
        let transport = StubTransport::default();
        let receipt = transport
            .register_did(
                &doc("did:key:already_registered"),
                Duration::from_secs(1),
                &GatewayCredentials::default(),
            )
            .await
            .unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.error_code, RegisterError::AlreadyRegistered);
    }

    #[tokio::test]
    async fn quota_exceeded_org_id_raises_quota_error() {
        let transport = StubTransport::default();
        let mut document = doc("did:key:zSomeLongEnoughDid");
        document.org_id = Some("quota_exceeded".to_string());
        let result = transport
            .register_did(&document, Duration::from_secs(1), &GatewayCredentials::default())
            .await;
        assert!(matches!(result, Err(GatewayError::QuotaExceeded)));
    }

    #[tokio::test]
    async fn well_formed_did_succeeds() {
        let transport = StubTransport::default();
        let receipt = transport
            .register_did(
                &doc("did:key:zSomeLongEnoughDid"),
                Duration::from_secs(1),
                &GatewayCredentials::default(),
            )
            .await
            .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.gas_used, 21_000);
    }
}

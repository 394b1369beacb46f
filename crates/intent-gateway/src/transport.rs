//! The transport abstraction shared by the proto and stub Gateway
//! backends.

use async_trait::async_trait;
use intent_types::error::GatewayError;
use intent_types::DidDocument;
use intent_types::TxReceipt;
use std::collections::HashMap;
use std::time::Duration;

/// Authorization metadata attached to every Gateway call. Exactly one of
/// `api_key` / `bearer_token` may be set.
#[derive(Debug, Clone, Default)]
pub struct GatewayCredentials {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

impl GatewayCredentials {
    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = std::env::var("INTENT_API_KEY").ok().map(|v| v.trim().to_string());
        let bearer_token = std::env::var("INTENT_BEARER_TOKEN")
            .ok()
            .map(|v| v.trim().to_string());
        let creds = Self { api_key, bearer_token };
        creds.validate()?;
        Ok(creds)
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.api_key.is_some() && self.bearer_token.is_some() {
            return Err(GatewayError::Other(
                "exactly one of api_key/bearer_token may be set, both were provided".into(),
            ));
        }
        Ok(())
    }

    pub fn authorization_header(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            return Some(format!("Key {key}"));
        }
        self.bearer_token.as_ref().map(|token| format!("Bearer {token}"))
    }

    pub fn metadata_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(value) = self.authorization_header() {
            map.insert("authorization".to_string(), value);
        }
        map
    }
}

/// Pluggable Gateway backend: either the real gRPC transport or the
/// offline stub. Both are first-class — the stub ships in production
/// builds as the deterministic fallback when gRPC is unavailable.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn initialize(&mut self, url: &str, verify_tls: bool) -> Result<(), GatewayError>;

    async fn register_did(
        &self,
        document: &DidDocument,
        timeout: Duration,
        credentials: &GatewayCredentials,
    ) -> Result<TxReceipt, GatewayError>;

    async fn close(&mut self);

    fn is_available(&self) -> bool;
}

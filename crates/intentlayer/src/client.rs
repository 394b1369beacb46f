//! `IntentClient`: orchestrates identity, the Gateway, the pinner, and the
//! ledger into the single `send_intent` call callers actually want.

use crate::abi;
use crate::error::IntentError;
use crate::rpc::{CallRequest, LedgerRpcClient};
use crate::tx::{wei_from_u128, LegacyTransaction};
use intent_crypto::secp::Signer;
use intent_gateway::{GatewayClient, GatewayCredentials, ProtoTransport, Transport};
use intent_identity::IdentityManager;
use intent_types::envelope::{ipfs_cid_to_bytes, normalize_hash_bytes};
use intent_types::error::{InactiveDIDError, NetworkError, ValidationError};
use intent_types::ledger::LedgerTxReceipt;
use intent_types::{resolve_network, tx_url, Identity, NetworkConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

const MIN_STAKE_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const RECEIPT_WAIT_TIMEOUT: Duration = Duration::from_secs(120);
const FALLBACK_GAS_LIMIT: u64 = 300_000;
const GAS_ESTIMATE_BUFFER: f64 = 1.10;

pub struct IntentClientConfig {
    pub network_name: String,
    pub pinner_url: String,
    pub signer: Option<Arc<dyn Signer>>,
    pub gateway_url: Option<String>,
    pub auto_did: bool,
    pub schema_version: u32,
}

impl IntentClientConfig {
    pub fn new(network_name: impl Into<String>, pinner_url: impl Into<String>) -> Self {
        Self {
            network_name: network_name.into(),
            pinner_url: pinner_url.into(),
            signer: None,
            gateway_url: None,
            auto_did: std::env::var("INTENT_AUTO_DID").map(|v| v != "false").unwrap_or(true),
            schema_version: std::env::var("INTENT_SCHEMA_VERSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }
}

pub struct SendIntentOptions {
    pub envelope_hash: String,
    pub payload: Value,
    pub gas: Option<u64>,
    pub gas_price: Option<Vec<u8>>,
    pub poll_interval: Duration,
    pub wait_for_receipt: bool,
    pub force: bool,
    pub allow_utf8_cid_fallback: bool,
}

impl SendIntentOptions {
    pub fn new(envelope_hash: impl Into<String>, payload: Value) -> Self {
        Self {
            envelope_hash: envelope_hash.into(),
            payload,
            gas: None,
            gas_price: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_for_receipt: true,
            force: false,
            allow_utf8_cid_fallback: false,
        }
    }
}

pub struct IntentClient {
    network: NetworkConfig,
    rpc: LedgerRpcClient,
    chain_id: u64,
    pinner: intent_pinner::PinnerClient,
    signer: Arc<dyn Signer>,
    identity: Option<Identity>,
    identity_manager: Option<Arc<IdentityManager>>,
    intent_recorder: [u8; 20],
    did_registry: Option<[u8; 20]>,
    min_stake_cache: AsyncMutex<Option<(Vec<u8>, Instant)>>,
}

impl IntentClient {
    pub async fn from_network(config: IntentClientConfig) -> Result<Self, IntentError> {
        let (network, rpc_url) = resolve_network(&config.network_name)
            .ok_or_else(|| NetworkError::UnknownNetwork(config.network_name.clone()))?;

        validate_url_scheme("pinner_url", &config.pinner_url)?;
        validate_url_scheme("rpc_url", &rpc_url)?;

        let rpc = LedgerRpcClient::new(rpc_url);
        let reported_chain_id = rpc.chain_id().await?;
        if reported_chain_id != network.chain_id {
            return Err(NetworkError::ChainIdMismatch {
                expected: network.chain_id,
                actual: reported_chain_id,
            }
            .into());
        }

        let mut identity = None;
        let signer: Arc<dyn Signer> = match config.signer {
            Some(explicit) => {
                if config.auto_did {
                    if let Ok(loaded) = intent_keystore::default_key_store().get_or_create_did(true) {
                        identity = Some(loaded);
                    }
                }
                explicit
            }
            None if config.auto_did => {
                let store = intent_keystore::default_key_store();
                let loaded = store.get_or_create_did(true)?;
                let rebound = loaded.signer.with_chain_id(network.chain_id);
                identity = Some(loaded);
                Arc::new(rebound)
            }
            None => {
                return Err(ValidationError::Other(
                    "no signer supplied and auto_did is disabled".to_string(),
                )
                .into())
            }
        };

        let gateway_url = config.gateway_url.or_else(|| std::env::var("INTENT_GATEWAY_URL").ok());
        let identity_manager = match (&identity, gateway_url) {
            (Some(identity), Some(url)) => {
                let credentials = GatewayCredentials::from_env()?;
                let client = connect_gateway(&url, credentials).await;
                Some(Arc::new(IdentityManager::new(identity.clone(), client)))
            }
            _ => None,
        };

        let intent_recorder = decode_contract_address(network.intent_recorder_address)?;
        let did_registry = network
            .did_registry_address
            .map(decode_contract_address)
            .transpose()?;

        Ok(Self {
            chain_id: network.chain_id,
            network,
            rpc,
            pinner: intent_pinner::PinnerClient::new(config.pinner_url),
            signer,
            identity,
            identity_manager,
            intent_recorder,
            did_registry,
            min_stake_cache: AsyncMutex::new(None),
        })
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        tx_url(self.network.name, self.chain_id, tx_hash)
    }

    pub fn did(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.did.as_str())
    }

    /// Reads `IntentRecorder.minStakeWei()`, caching the result for 15
    /// minutes so repeated `send_intent` calls don't re-read the contract
    /// on every invocation.
    pub async fn min_stake_wei(&self) -> Result<Vec<u8>, IntentError> {
        {
            let cache = self.min_stake_cache.lock().await;
            if let Some((value, fetched_at)) = cache.as_ref() {
                if fetched_at.elapsed() < MIN_STAKE_TTL {
                    return Ok(value.clone());
                }
            }
        }

        let request = CallRequest {
            from: None,
            to: self.intent_recorder,
            value: Vec::new(),
            data: abi::encode_min_stake_wei(),
        };
        let output = self.rpc.eth_call(&request).await?;
        let value = abi::decode_uint256(&output);

        let mut cache = self.min_stake_cache.lock().await;
        *cache = Some((value.clone(), Instant::now()));
        Ok(value)
    }

    async fn resolve_did_owner(&self, did: &str) -> Result<Option<([u8; 20], bool)>, IntentError> {
        let Some(registry) = self.did_registry else {
            return Ok(None);
        };
        let request = CallRequest {
            from: None,
            to: registry,
            value: Vec::new(),
            data: abi::encode_resolve(did),
        };
        let output = self.rpc.eth_call(&request).await?;
        Ok(abi::decode_resolve_result(&output))
    }

    pub async fn send_intent(&self, options: SendIntentOptions) -> Result<LedgerTxReceipt, IntentError> {
        if !options.payload.is_object() {
            return Err(ValidationError::Other("payload must be a JSON object".to_string()).into());
        }

        if let Some(manager) = &self.identity_manager {
            match manager.ensure_registered(options.force).await {
                Ok(_) => {}
                Err(intent_types::error::GatewayError::QuotaExceeded) => {
                    return Err(intent_types::error::GatewayError::QuotaExceeded.into());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "gateway registration failed, proceeding on the strength of the on-chain record");
                }
            }
        }

        if let Some(did) = self.did() {
            if let Some((owner, active)) = self.resolve_did_owner(did).await? {
                if !active && !options.force {
                    return Err(InactiveDIDError {
                        did: did.to_string(),
                        owner: format!("0x{}", hex::encode(owner)),
                    }
                    .into());
                }
            }
        }

        let cid = self.pinner.pin(&options.payload).await?;
        let cid_bytes = ipfs_cid_to_bytes(&cid, options.allow_utf8_cid_fallback)?;
        let envelope_hash = normalize_hash_bytes(&options.envelope_hash)?;

        let min_stake = self.min_stake_wei().await?;
        let data = abi::encode_record_intent(&envelope_hash, &cid_bytes);

        let nonce = self.rpc.transaction_count(&self.signer.address()).await?;
        let gas_price = match options.gas_price {
            Some(price) => price,
            None => wei_from_u128(self.rpc.gas_price().await?),
        };
        let gas_limit = match options.gas {
            Some(gas) => gas,
            None => {
                let estimate_request = CallRequest {
                    from: Some(self.signer.address()),
                    to: self.intent_recorder,
                    value: min_stake.clone(),
                    data: data.clone(),
                };
                let estimated = match self.rpc.estimate_gas(&estimate_request).await {
                    Ok(gas) => gas,
                    Err(e) => {
                        tracing::warn!(error = %e, "gas estimation failed, falling back to a fixed limit");
                        FALLBACK_GAS_LIMIT
                    }
                };
                (estimated as f64 * GAS_ESTIMATE_BUFFER) as u64
            }
        };

        let transaction = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to: Some(self.intent_recorder),
            value: min_stake,
            data,
        };

        let signed = transaction
            .sign(self.signer.as_ref(), self.chain_id)
            .map_err(|e| intent_types::error::TransactionError::Signing(e.to_string()))?;

        let tx_hash = self
            .rpc
            .send_raw_transaction(&signed)
            .await
            .map_err(|e| intent_types::error::TransactionError::Broadcast(e.to_string()))?;

        if !options.wait_for_receipt {
            return Ok(LedgerTxReceipt {
                transaction_hash: tx_hash,
                block_number: 0,
                block_hash: String::new(),
                status: 0,
                gas_used: 0,
                from: format!("0x{}", hex::encode(self.signer.address())),
                to: Some(format!("0x{}", hex::encode(self.intent_recorder))),
                logs: Vec::new(),
            });
        }

        self.wait_for_receipt(&tx_hash, options.poll_interval).await
    }

    async fn wait_for_receipt(&self, tx_hash: &str, poll_interval: Duration) -> Result<LedgerTxReceipt, IntentError> {
        let deadline = Instant::now() + RECEIPT_WAIT_TIMEOUT;
        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(intent_types::error::TransactionError::ReceiptTimeout(
                    RECEIPT_WAIT_TIMEOUT.as_millis() as u64,
                )
                .into());
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

async fn connect_gateway(url: &str, credentials: GatewayCredentials) -> Arc<GatewayClient> {
    let built = {
        let mut transport = ProtoTransport::default();
        match transport.initialize(url, true).await {
            Ok(()) => GatewayClient::new(Box::new(transport), credentials),
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "could not reach the gateway over grpc, falling back to the offline stub");
                GatewayClient::stub(credentials)
            }
        }
    };
    intent_gateway::get_or_insert_with(url, move || built)
}

fn validate_url_scheme(field: &'static str, url: &str) -> Result<(), ValidationError> {
    let is_loopback = url.contains("://localhost") || url.contains("://127.0.0.1");
    if url.starts_with("https://") || (is_loopback && url.starts_with("http://")) {
        return Ok(());
    }
    Err(ValidationError::InsecureUrl {
        field,
        value: url.to_string(),
    })
}

fn decode_contract_address(hex_str: &str) -> Result<[u8; 20], IntentError> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(stripped).map_err(|_| {
        ValidationError::NotHex {
            field: "contract_address",
            expected_len: 20,
            value: hex_str.to_string(),
        }
    })?;
    bytes.try_into().map_err(|_| {
        ValidationError::NotHex {
            field: "contract_address",
            expected_len: 20,
            value: hex_str.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_scheme_accepts_https() {
        assert!(validate_url_scheme("pinner_url", "https://pin.example.com").is_ok());
    }

    #[test]
    fn validate_url_scheme_accepts_http_loopback() {
        assert!(validate_url_scheme("pinner_url", "http://localhost:8080").is_ok());
    }

    #[test]
    fn validate_url_scheme_rejects_http_non_loopback() {
        assert!(validate_url_scheme("pinner_url", "http://pin.example.com").is_err());
    }

    #[test]
    fn decode_contract_address_round_trips() {
        let addr = decode_contract_address("0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(addr[19], 1);
    }
}

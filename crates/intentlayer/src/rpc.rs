//! A minimal JSON-RPC client over the ledger's Ethereum-compatible
//! surface: the handful of `eth_*` methods the orchestration layer needs,
//! plus raw `eth_call` for reading contract view functions.

use intent_types::error::NetworkError;
use intent_types::ledger::{LedgerTxReceipt, LogEntry};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LedgerRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl LedgerRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client with static config always builds"),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, NetworkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NetworkError::RpcFailed {
                method: method.to_string(),
                message: e.to_string(),
            })?;

        let envelope: Value = response.json().await.map_err(|e| NetworkError::RpcFailed {
            method: method.to_string(),
            message: e.to_string(),
        })?;

        if let Some(error) = envelope.get("error") {
            return Err(NetworkError::RpcFailed {
                method: method.to_string(),
                message: error.to_string(),
            });
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| NetworkError::RpcFailed {
                method: method.to_string(),
                message: "response had neither result nor error".to_string(),
            })
    }

    pub async fn chain_id(&self) -> Result<u64, NetworkError> {
        let result = self.call("eth_chainId", json!([])).await?;
        parse_quantity(&result, "eth_chainId")
    }

    pub async fn transaction_count(&self, address: &[u8; 20]) -> Result<u64, NetworkError> {
        let result = self
            .call("eth_getTransactionCount", json!([to_hex_address(address), "latest"]))
            .await?;
        parse_quantity(&result, "eth_getTransactionCount")
    }

    pub async fn gas_price(&self) -> Result<u128, NetworkError> {
        let result = self.call("eth_gasPrice", json!([])).await?;
        parse_quantity_u128(&result, "eth_gasPrice")
    }

    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, NetworkError> {
        let result = self.call("eth_estimateGas", json!([request.to_json()])).await?;
        parse_quantity(&result, "eth_estimateGas")
    }

    pub async fn eth_call(&self, request: &CallRequest) -> Result<Vec<u8>, NetworkError> {
        let result = self.call("eth_call", json!([request.to_json(), "latest"])).await?;
        let hex_str = result.as_str().ok_or_else(|| NetworkError::RpcFailed {
            method: "eth_call".to_string(),
            message: "result was not a hex string".to_string(),
        })?;
        decode_hex(hex_str, "eth_call")
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, NetworkError> {
        let result = self
            .call("eth_sendRawTransaction", json!([format!("0x{}", hex::encode(raw))]))
            .await?;
        result.as_str().map(str::to_string).ok_or_else(|| NetworkError::RpcFailed {
            method: "eth_sendRawTransaction".to_string(),
            message: "result was not a string".to_string(),
        })
    }

    /// `None` when the transaction is still pending.
    pub async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<LedgerTxReceipt>, NetworkError> {
        let result = self.call("eth_getTransactionReceipt", json!([tx_hash])).await?;
        if result.is_null() {
            return Ok(None);
        }
        parse_receipt(&result).map(Some)
    }
}

/// An `eth_call`/`eth_estimateGas` request object.
pub struct CallRequest {
    pub from: Option<[u8; 20]>,
    pub to: [u8; 20],
    pub value: Vec<u8>,
    pub data: Vec<u8>,
}

impl CallRequest {
    fn to_json(&self) -> Value {
        let mut object = json!({
            "to": to_hex_address(&self.to),
            "data": format!("0x{}", hex::encode(&self.data)),
        });
        if let Some(from) = self.from {
            object["from"] = json!(to_hex_address(&from));
        }
        if !self.value.is_empty() {
            object["value"] = json!(format!("0x{}", hex::encode(&self.value)));
        }
        object
    }
}

fn to_hex_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

fn decode_hex(value: &str, method: &str) -> Result<Vec<u8>, NetworkError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| NetworkError::RpcFailed {
        method: method.to_string(),
        message: format!("malformed hex in response: {e}"),
    })
}

fn parse_quantity(value: &Value, method: &str) -> Result<u64, NetworkError> {
    let text = value.as_str().ok_or_else(|| NetworkError::RpcFailed {
        method: method.to_string(),
        message: "result was not a hex quantity string".to_string(),
    })?;
    u64::from_str_radix(text.strip_prefix("0x").unwrap_or(text), 16).map_err(|e| NetworkError::RpcFailed {
        method: method.to_string(),
        message: format!("malformed quantity: {e}"),
    })
}

fn parse_quantity_u128(value: &Value, method: &str) -> Result<u128, NetworkError> {
    let text = value.as_str().ok_or_else(|| NetworkError::RpcFailed {
        method: method.to_string(),
        message: "result was not a hex quantity string".to_string(),
    })?;
    u128::from_str_radix(text.strip_prefix("0x").unwrap_or(text), 16).map_err(|e| NetworkError::RpcFailed {
        method: method.to_string(),
        message: format!("malformed quantity: {e}"),
    })
}

fn parse_receipt(value: &Value) -> Result<LedgerTxReceipt, NetworkError> {
    let method = "eth_getTransactionReceipt";
    let field = |name: &str| -> Result<&Value, NetworkError> {
        value.get(name).ok_or_else(|| NetworkError::RpcFailed {
            method: method.to_string(),
            message: format!("receipt missing field {name}"),
        })
    };

    let status_text = field("status")?.as_str().unwrap_or("0x0");
    let status = u8::from_str_radix(status_text.strip_prefix("0x").unwrap_or(status_text), 16).unwrap_or(0);

    let logs = value
        .get("logs")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| LogEntry {
                    address: entry.get("address").and_then(Value::as_str).unwrap_or_default().to_string(),
                    topics: entry
                        .get("topics")
                        .and_then(Value::as_array)
                        .map(|t| t.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                        .unwrap_or_default(),
                    data: entry.get("data").and_then(Value::as_str).unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(LedgerTxReceipt {
        transaction_hash: field("transactionHash")?.as_str().unwrap_or_default().to_string(),
        block_number: parse_quantity(field("blockNumber")?, method)?,
        block_hash: field("blockHash")?.as_str().unwrap_or_default().to_string(),
        status,
        gas_used: parse_quantity(field("gasUsed")?, method)?,
        from: field("from")?.as_str().unwrap_or_default().to_string(),
        to: value.get("to").and_then(Value::as_str).map(str::to_string),
        logs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chain_id_parses_hex_quantity() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#)
            .create_async()
            .await;

        let client = LedgerRpcClient::new(server.url());
        assert_eq!(client.chain_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rpc_error_field_is_surfaced_as_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#)
            .create_async()
            .await;

        let client = LedgerRpcClient::new(server.url());
        assert!(client.chain_id().await.is_err());
    }

    #[tokio::test]
    async fn missing_receipt_is_none_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .create_async()
            .await;

        let client = LedgerRpcClient::new(server.url());
        assert!(client.transaction_receipt("0xabc").await.unwrap().is_none());
    }
}

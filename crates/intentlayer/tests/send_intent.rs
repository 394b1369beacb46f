//! End-to-end exercise of `IntentClient::send_intent` against a mocked
//! pinner and a mocked ledger RPC endpoint, with the stub Gateway
//! transport standing in for a reachable Gateway.

use std::sync::Arc;

use intent_crypto::secp::LocalSigner;
use intentlayer::{IntentClient, IntentClientConfig, SendIntentOptions};
use mockito::Matcher;
use serde_json::json;

const SEPOLIA_CHAIN_ID_HEX: &str = "0xaa36a7";
const A_CID: &str = "QmcRD4wkPPi6dig81r5sLj9Zm1gDMgSrbr3oESATsbHRJP";

async fn build_client(ledger_url: &str, pinner_url: &str) -> IntentClient {
    std::env::set_var("SEPOLIA_RPC_URL", ledger_url);
    let signer = LocalSigner::from_ed25519_seed(&[7u8; 32], 11155111).unwrap();

    let mut config = IntentClientConfig::new("sepolia", pinner_url);
    config.signer = Some(Arc::new(signer));
    config.auto_did = false;

    IntentClient::from_network(config).await.unwrap()
}

#[tokio::test]
async fn send_intent_pins_records_and_waits_for_receipt() {
    let mut ledger = mockito::Server::new_async().await;
    let mut pinner = mockito::Server::new_async().await;

    let _chain_id = ledger
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_chainId".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc":"2.0","id":1,"result": SEPOLIA_CHAIN_ID_HEX}).to_string())
        .create_async()
        .await;

    let _min_stake = ledger
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_call".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc":"2.0","id":1,"result": format!("0x{}", "0".repeat(62) + "01")}).to_string())
        .create_async()
        .await;

    let _nonce = ledger
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_getTransactionCount".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc":"2.0","id":1,"result":"0x5"}).to_string())
        .create_async()
        .await;

    let _send_raw = ledger
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_sendRawTransaction".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc":"2.0","id":1,"result":"0xfeed"}).to_string())
        .create_async()
        .await;

    let _receipt = ledger
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_getTransactionReceipt".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "transactionHash": "0xfeed",
                    "blockNumber": "0x10",
                    "blockHash": "0xabc",
                    "status": "0x1",
                    "gasUsed": "0x5208",
                    "from": "0x0000000000000000000000000000000000000007",
                    "to": "0x0000000000000000000000000000000000000005",
                    "logs": [],
                },
            })
            .to_string(),
        )
        .create_async()
        .await;

    let _pin = pinner
        .mock("POST", "/pin")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"cid": A_CID}).to_string())
        .create_async()
        .await;

    let client = build_client(&ledger.url(), &pinner.url()).await;

    let mut options = SendIntentOptions::new(
        "0x".to_string() + &"ab".repeat(32),
        json!({"model": "gpt-4o", "prompt": "book a flight"}),
    );
    options.gas = Some(250_000);
    options.gas_price = Some(vec![0x3b, 0x9a, 0xca, 0x00]);

    let receipt = client.send_intent(options).await.unwrap();
    assert_eq!(receipt.transaction_hash, "0xfeed");
    assert_eq!(receipt.status, 1);
    assert_eq!(receipt.block_number, 16);
}

#[tokio::test]
async fn min_stake_wei_is_cached_across_repeated_reads() {
    let mut ledger = mockito::Server::new_async().await;
    let pinner = mockito::Server::new_async().await;

    let _chain_id = ledger
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_chainId".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc":"2.0","id":1,"result": SEPOLIA_CHAIN_ID_HEX}).to_string())
        .create_async()
        .await;

    let min_stake = ledger
        .mock("POST", "/")
        .match_body(Matcher::Regex("eth_call".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc":"2.0","id":1,"result": format!("0x{}", "0".repeat(62) + "01")}).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = build_client(&ledger.url(), &pinner.url()).await;

    let first = client.min_stake_wei().await.unwrap();
    let second = client.min_stake_wei().await.unwrap();
    assert_eq!(first, second);

    min_stake.assert_async().await;
}

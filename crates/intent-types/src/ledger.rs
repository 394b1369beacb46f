//! The canonical ledger transaction receipt, after conversion from the
//! raw JSON-RPC response into hex-stringified, typed fields.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerTxReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub block_hash: String,
    pub status: u8,
    pub gas_used: u64,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub logs: Vec<LogEntry>,
}

impl LedgerTxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

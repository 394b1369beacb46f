//! Client SDK for proving on-chain commitment to a model call before it
//! is issued: pin the call's envelope, record its hash on the ledger,
//! and hand back a receipt a caller can point at.
//!
//! The entry point is [`IntentClient`]. Most callers only need
//! [`IntentClient::from_network`] and [`IntentClient::send_intent`]; the
//! `abi`, `tx`, and `rpc` modules exist to support that orchestration
//! and are public mainly so other crates in this workspace can reuse
//! the wire-level pieces without re-deriving them.

mod abi;
pub mod client;
pub mod error;
pub mod rpc;
mod tx;

pub use client::{IntentClient, IntentClientConfig, SendIntentOptions};
pub use error::IntentError;
pub use intent_types::ledger::LedgerTxReceipt;

pub fn init_tracing() -> anyhow::Result<()> {
    intent_telemetry::init_tracing()
}

//! Wire schemas, the shared error taxonomy, and the built-in network table
//! for the intent layer SDK.

pub mod envelope;
pub mod error;
pub mod identity;
pub mod identity_doc;
pub mod ledger;
pub mod network;
pub mod rate_limited_log;

pub use envelope::{CallEnvelope, CallEnvelopeBuilder};
pub use identity::Identity;
pub use identity_doc::{DidDocument, TxReceipt};
pub use ledger::LedgerTxReceipt;
pub use network::{resolve_network, tx_url, NetworkConfig};

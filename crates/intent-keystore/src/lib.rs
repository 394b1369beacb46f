//! The durable, interprocess-locked JSON key store that backs every
//! `Identity` in the SDK.

pub mod error;
mod lock;
pub mod singleton;
pub mod store;

pub use error::KeyStoreError;
pub use singleton::{default_key_store, key_store_at};
pub use store::{create_identity, KeyStore, StoredIdentity, StoredMetadata};

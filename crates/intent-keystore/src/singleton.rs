//! The process-wide `KeyStore` registry, keyed by resolved path. A new
//! entry is created only the first time a given path is seen; callers
//! that change `INTENT_KEY_STORE_PATH` between calls get a fresh store
//! rather than a stale cached one.

use crate::store::KeyStore;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

static REGISTRY: Lazy<Mutex<HashMap<PathBuf, Arc<KeyStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns the shared `KeyStore` for the default (env-resolved) path,
/// creating it on first access.
pub fn default_key_store() -> Arc<KeyStore> {
    key_store_at(KeyStore::default_path())
}

/// Returns the shared `KeyStore` for `path`, creating it on first access.
pub fn key_store_at(path: PathBuf) -> Arc<KeyStore> {
    let mut registry = REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    registry
        .entry(path.clone())
        .or_insert_with(|| Arc::new(KeyStore::at_path(path)))
        .clone()
}

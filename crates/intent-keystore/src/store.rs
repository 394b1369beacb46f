//! The durable, interprocess-locked JSON key store.

use crate::error::KeyStoreError;
use crate::lock::{self, DEFAULT_TIMEOUT};
use chrono::{DateTime, Utc};
use intent_crypto::{aead, secp::LocalSigner};
use intent_types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Unencrypted metadata kept alongside every entry so listing and
/// "most recent" selection never require the master key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub created_at: DateTime<Utc>,
}

/// A single at-rest identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIdentity {
    /// base64(nonce ‖ ciphertext ‖ tag) of the JSON-encoded secret payload.
    pub encrypted: String,
    pub metadata: StoredMetadata,
    pub version: u32,
}

/// The plaintext payload sealed inside `StoredIdentity::encrypted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SecretPayload {
    did: String,
    created_at: DateTime<Utc>,
    private_key_b64: String,
    public_key_b64: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileLayout {
    #[serde(default)]
    identities: BTreeMap<String, StoredIdentity>,
}

const CURRENT_VERSION: u32 = 1;

/// A JSON-file-backed key store, safe across threads within a process and
/// across processes via an OS advisory lock.
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolves the store path: `INTENT_KEY_STORE_PATH` if set, otherwise
    /// `~/.intentlayer/keys.json`.
    pub fn default_path() -> PathBuf {
        if let Ok(p) = std::env::var("INTENT_KEY_STORE_PATH") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".intentlayer")
            .join("keys.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_layout(&self) -> Result<FileLayout, KeyStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(FileLayout::default()),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| KeyStoreError::Corrupt(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileLayout::default()),
            Err(e) => Err(KeyStoreError::Io {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    fn write_layout(&self, layout: &FileLayout) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KeyStoreError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
            set_owner_only_permissions(parent);
        }
        let pretty = serde_json::to_string_pretty(layout)
            .map_err(|e| KeyStoreError::Corrupt(e.to_string()))?;
        std::fs::write(&self.path, pretty).map_err(|e| KeyStoreError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        set_owner_only_file_permissions(&self.path);
        Ok(())
    }

    fn with_lock<T>(
        &self,
        f: impl FnOnce(&mut FileLayout) -> Result<T, KeyStoreError>,
    ) -> Result<T, KeyStoreError> {
        let _lock = lock::acquire(&self.path, DEFAULT_TIMEOUT)?;
        let mut layout = self.read_layout()?;
        let result = f(&mut layout)?;
        self.write_layout(&layout)?;
        Ok(result)
    }

    /// Inserts an already-sealed record directly. The invariant that the
    /// encrypted blob's own `did` matches `did` is the caller's
    /// responsibility — most callers should go through [`create_identity`]
    /// or [`KeyStore::add_raw`] instead, which build that blob correctly.
    pub fn add(&self, did: &str, stored: StoredIdentity) -> Result<(), KeyStoreError> {
        self.with_lock(|layout| {
            layout.identities.insert(did.to_string(), stored);
            Ok(())
        })
    }

    /// Encrypts and stores a raw secret payload — used by
    /// [`create_identity`] where the Ed25519 seed is available directly,
    /// rather than reconstructed from a `LocalSigner`.
    pub fn add_raw(
        &self,
        did: &str,
        private_key_b64: String,
        public_key_b64: String,
        created_at: DateTime<Utc>,
    ) -> Result<(), KeyStoreError> {
        let key = aead::get_encryption_key()?;
        let payload = SecretPayload {
            did: did.to_string(),
            created_at,
            private_key_b64,
            public_key_b64,
        };
        let plaintext = serde_json::to_vec(&payload).map_err(|e| KeyStoreError::Corrupt(e.to_string()))?;
        let encrypted = aead::encrypt(&key, &plaintext)?;

        self.with_lock(|layout| {
            layout.identities.insert(
                did.to_string(),
                StoredIdentity {
                    encrypted,
                    metadata: StoredMetadata { created_at },
                    version: CURRENT_VERSION,
                },
            );
            Ok(())
        })
    }

    pub fn get(&self, did: &str) -> Result<Identity, KeyStoreError> {
        let _lock = lock::acquire(&self.path, DEFAULT_TIMEOUT)?;
        let layout = self.read_layout()?;
        let stored = layout
            .identities
            .get(did)
            .ok_or_else(|| KeyStoreError::NotFound(did.to_string()))?;
        decrypt_identity(stored)
    }

    pub fn list(&self) -> Result<Vec<StoredIdentity>, KeyStoreError> {
        let _lock = lock::acquire(&self.path, DEFAULT_TIMEOUT)?;
        let layout = self.read_layout()?;
        Ok(layout.identities.into_values().collect())
    }

    pub fn delete(&self, did: &str) -> Result<(), KeyStoreError> {
        self.with_lock(|layout| {
            layout.identities.remove(did);
            Ok(())
        })
    }

    pub fn clear(&self) -> Result<(), KeyStoreError> {
        self.with_lock(|layout| {
            layout.identities.clear();
            Ok(())
        })
    }

    /// Loads the most recently created identity, or creates one if the
    /// store is empty and `auto` is true.
    pub fn get_or_create_did(&self, auto: bool) -> Result<Identity, KeyStoreError> {
        let entries = self.list()?;
        if let Some(latest) = entries
            .iter()
            .enumerate()
            .max_by_key(|(idx, entry)| (entry.metadata.created_at, *idx))
            .map(|(_, entry)| entry)
        {
            return decrypt_identity(latest);
        }

        if !auto {
            return Err(KeyStoreError::EmptyNoAutoCreate);
        }
        create_identity(self)
    }
}

fn decrypt_identity(stored: &StoredIdentity) -> Result<Identity, KeyStoreError> {
    let key = aead::get_encryption_key()?;
    let plaintext = aead::decrypt(&key, &stored.encrypted)?;
    let payload: SecretPayload =
        serde_json::from_slice(&plaintext).map_err(|e| KeyStoreError::Corrupt(e.to_string()))?;

    let seed_bytes = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        payload.private_key_b64,
    )
    .map_err(|e| KeyStoreError::Corrupt(e.to_string()))?;
    let seed: [u8; 32] = seed_bytes
        .try_into()
        .map_err(|_| KeyStoreError::Corrupt("stored private key is not 32 bytes".into()))?;

    let signer = LocalSigner::from_ed25519_seed(&seed, 1)?;
    Ok(Identity::new(
        payload.did,
        signer,
        SystemTime::from(payload.created_at),
    ))
}

/// Generates a fresh Ed25519-seeded identity, persists it, and returns the
/// in-memory handle.
pub fn create_identity(store: &KeyStore) -> Result<Identity, KeyStoreError> {
    let (seed, public_key) = intent_crypto::generate_ed25519_keypair();
    let did = intent_crypto::derive_did(&public_key);
    let created_at = Utc::now();

    let private_key_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, seed);
    let public_key_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, public_key);
    store.add_raw(&did, private_key_b64, public_key_b64, created_at)?;

    let signer = LocalSigner::from_ed25519_seed(&seed, 1)?;
    Ok(Identity::new(did, signer, SystemTime::from(created_at)))
}

fn set_owner_only_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            let _ = std::fs::set_permissions(path, perms);
        }
    }
    #[cfg(not(unix))]
    {
        tracing::debug!(path = %path.display(), "ACL enforcement for key store directory is delegated to the OS on this platform");
    }
}

fn set_owner_only_file_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            let _ = std::fs::set_permissions(path, perms);
        }
    }
    #[cfg(not(unix))]
    {
        tracing::debug!(path = %path.display(), "ACL enforcement for key store file is delegated to the OS on this platform");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, KeyStore) {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("CI", "true");
        std::env::set_var("INTENT_MASTER_KEY", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=");
        let path = dir.path().join("keys.json");
        (dir, KeyStore::at_path(path))
    }

    #[test]
    fn empty_store_without_auto_create_fails() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.get_or_create_did(false),
            Err(KeyStoreError::EmptyNoAutoCreate)
        ));
    }

    #[test]
    fn empty_store_with_auto_create_persists_a_new_identity() {
        let (_dir, store) = temp_store();
        let identity = store.get_or_create_did(true).unwrap();
        assert!(identity.did.starts_with("did:key:z"));

        let reloaded = store.get(&identity.did).unwrap();
        assert_eq!(reloaded.did, identity.did);
    }

    #[test]
    fn get_or_create_did_picks_latest_created_at_on_repeat_calls() {
        let (_dir, store) = temp_store();
        let first = create_identity(&store).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = create_identity(&store).unwrap();

        let picked = store.get_or_create_did(false).unwrap();
        assert_eq!(picked.did, second.did);
        assert_ne!(picked.did, first.did);
    }

    #[test]
    fn delete_then_list_reflects_removal() {
        let (_dir, store) = temp_store();
        let identity = create_identity(&store).unwrap();
        store.delete(&identity.did).unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}

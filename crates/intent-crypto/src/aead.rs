//! Envelope-at-rest encryption for the on-disk key store, and master-key
//! resolution across the OS-native secret store and the CI escape hatch.

use crate::error::CryptoError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use std::sync::OnceLock;
use zeroize::Zeroizing;

const KEYRING_SERVICE: &str = "intentlayer-sdk";
const KEYRING_ENTRY: &str = "master-key";
const NONCE_LEN: usize = 24;

/// Encrypts `plaintext` with XChaCha20-Poly1305 under `key`, returning
/// base64(nonce ‖ ciphertext) suitable for storage as a JSON string value.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<String, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::OperationFailed(format!("encryption failed: {e}")))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(blob))
}

/// Decrypts a blob produced by [`encrypt`].
pub fn decrypt(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let blob = BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidInput(format!("not valid base64: {e}")))?;
    if blob.len() < NONCE_LEN {
        return Err(CryptoError::InvalidInput(
            "ciphertext shorter than nonce".into(),
        ));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

fn master_key_cache() -> &'static OnceLock<Zeroizing<[u8; 32]>> {
    static CACHE: OnceLock<Zeroizing<[u8; 32]>> = OnceLock::new();
    &CACHE
}

/// Resolves the 32-byte master key used to encrypt the key store, in order:
///
/// 1. The OS-native secret store (Keychain / Secret Service / Credential
///    Manager), via the `keyring` crate.
/// 2. `INTENT_MASTER_KEY` (base64, 32 bytes), but only when `CI=true` — a
///    plaintext env var is never trusted as a production secret source.
/// 3. If `CI=true` and neither is present, a fresh key is generated and
///    written back to the OS secret store so subsequent runs are stable.
///
/// Resolved once per process and cached.
pub fn get_encryption_key() -> Result<[u8; 32], CryptoError> {
    if let Some(cached) = master_key_cache().get() {
        return Ok(**cached);
    }

    let key = resolve_master_key()?;
    let _ = master_key_cache().set(Zeroizing::new(key));
    Ok(key)
}

fn resolve_master_key() -> Result<[u8; 32], CryptoError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY)
        .map_err(|e| CryptoError::SecretStore(e.to_string()))?;

    match entry.get_password() {
        Ok(encoded) => return decode_master_key(&encoded),
        Err(keyring::Error::NoEntry) => {}
        Err(e) => return Err(CryptoError::SecretStore(e.to_string())),
    }

    let ci = std::env::var("CI").map(|v| v == "true").unwrap_or(false);

    if let Ok(encoded) = std::env::var("INTENT_MASTER_KEY") {
        if !ci {
            return Err(CryptoError::NoMasterKey);
        }
        let key = decode_master_key(&encoded)?;
        if let Err(e) = entry.set_password(&encoded) {
            tracing::debug!(error = %e, "could not persist INTENT_MASTER_KEY to OS secret store");
        }
        return Ok(key);
    }

    if !ci {
        return Err(CryptoError::NoMasterKey);
    }

    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    let encoded = BASE64.encode(key);
    entry
        .set_password(&encoded)
        .map_err(|e| CryptoError::SecretStore(e.to_string()))?;
    Ok(key)
}

fn decode_master_key(encoded: &str) -> Result<[u8; 32], CryptoError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptoError::MalformedMasterKey(e.to_string()))?;
    let key: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::MalformedMasterKey(format!("expected 32 bytes, got {}", v.len()))
    })?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = [3u8; 32];
        let ciphertext = encrypt(&key, b"top secret seed bytes").unwrap();
        let plaintext = decrypt(&key, &ciphertext).unwrap();
        assert_eq!(plaintext, b"top secret seed bytes");
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let key_a = [1u8; 32];
        let key_b = [2u8; 32];
        let ciphertext = encrypt(&key_a, b"data").unwrap();
        assert!(decrypt(&key_b, &ciphertext).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let key = [5u8; 32];
        let mut ciphertext = BASE64.decode(encrypt(&key, b"data").unwrap()).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xff;
        let tampered = BASE64.encode(ciphertext);
        assert!(decrypt(&key, &tampered).is_err());
    }

    #[test]
    fn each_encryption_uses_a_fresh_nonce() {
        let key = [9u8; 32];
        let a = encrypt(&key, b"same plaintext").unwrap();
        let b = encrypt(&key, b"same plaintext").unwrap();
        assert_ne!(a, b);
    }
}

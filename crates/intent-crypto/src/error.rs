//! Error types for the `intent-crypto` crate.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// Mirrors the `ErrorCode` convention used across the SDK so every public
/// error, regardless of which crate raised it, can be logged and matched
/// on by a stable identifier rather than a `Display` string.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

/// Errors from cryptographic operations: key generation, signing,
/// encryption, and master-key resolution.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed")]
    VerificationFailed,

    /// The provided key material is malformed or the wrong length.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The provided signature bytes are malformed.
    #[error("invalid signature format: {0}")]
    InvalidSignature(String),

    /// A cryptographic library call failed.
    #[error("cryptographic operation failed: {0}")]
    OperationFailed(String),

    /// Authenticated decryption failed (wrong key or tampered ciphertext).
    #[error("decryption failed: wrong key or corrupted/tampered ciphertext")]
    DecryptionFailed,

    /// The on-disk/at-rest blob is structurally invalid.
    #[error("invalid envelope format: {0}")]
    InvalidInput(String),

    /// No master encryption key could be resolved.
    #[error(
        "no master encryption key available: not found in OS secret store, \
         INTENT_MASTER_KEY is only honored when CI=true, and CI is not set"
    )]
    NoMasterKey,

    /// `INTENT_MASTER_KEY` was not valid base64 or not 32 bytes.
    #[error("INTENT_MASTER_KEY is malformed: {0}")]
    MalformedMasterKey(String),

    /// The OS-native secret store could not be reached.
    #[error("OS secret store error: {0}")]
    SecretStore(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::OperationFailed(_) => "CRYPTO_OPERATION_FAILED",
            Self::DecryptionFailed => "CRYPTO_DECRYPTION_FAILED",
            Self::InvalidInput(_) => "CRYPTO_INVALID_INPUT",
            Self::NoMasterKey => "CRYPTO_NO_MASTER_KEY",
            Self::MalformedMasterKey(_) => "CRYPTO_MALFORMED_MASTER_KEY",
            Self::SecretStore(_) => "CRYPTO_SECRET_STORE_ERROR",
        }
    }
}

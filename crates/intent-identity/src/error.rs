use intent_crypto::error::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("could not acquire the registration lock: {0}")]
    LockUnavailable(String),

    #[error(transparent)]
    Gateway(#[from] intent_types::error::GatewayError),

    #[error(transparent)]
    KeyStore(#[from] intent_keystore::KeyStoreError),
}

impl ErrorCode for IdentityError {
    fn code(&self) -> &'static str {
        match self {
            Self::LockUnavailable(_) => "IDENTITY_LOCK_UNAVAILABLE",
            Self::Gateway(e) => e.code(),
            Self::KeyStore(e) => e.code(),
        }
    }
}

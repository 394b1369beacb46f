use intent_crypto::error::ErrorCode;
use intent_types::error::{
    EnvelopeError, GatewayError, InactiveDIDError, NetworkError, PinningError, TransactionError,
    ValidationError,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Pinning(#[from] PinningError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    InactiveDid(#[from] InactiveDIDError),

    #[error(transparent)]
    KeyStore(#[from] intent_keystore::KeyStoreError),

    #[error(transparent)]
    Crypto(#[from] intent_crypto::error::CryptoError),
}

impl ErrorCode for IntentError {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Envelope(e) => e.code(),
            Self::Network(e) => e.code(),
            Self::Transaction(e) => e.code(),
            Self::Pinning(e) => e.code(),
            Self::Gateway(e) => e.code(),
            Self::InactiveDid(e) => e.code(),
            Self::KeyStore(e) => e.code(),
            Self::Crypto(e) => e.code(),
        }
    }
}

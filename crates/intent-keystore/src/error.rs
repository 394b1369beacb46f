use intent_crypto::error::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("key store file is not valid JSON: {0}")]
    Corrupt(String),

    #[error("could not acquire the key store lock within {0:?}")]
    LockTimeout(std::time::Duration),

    #[error("no identity found for did {0}")]
    NotFound(String),

    #[error("key store is empty and auto-create was not requested")]
    EmptyNoAutoCreate,

    #[error(transparent)]
    Crypto(#[from] intent_crypto::error::CryptoError),
}

impl ErrorCode for KeyStoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "KEYSTORE_IO_ERROR",
            Self::Corrupt(_) => "KEYSTORE_CORRUPT",
            Self::LockTimeout(_) => "KEYSTORE_LOCK_TIMEOUT",
            Self::NotFound(_) => "KEYSTORE_NOT_FOUND",
            Self::EmptyNoAutoCreate => "KEYSTORE_EMPTY_NO_AUTO_CREATE",
            Self::Crypto(e) => e.code(),
        }
    }
}

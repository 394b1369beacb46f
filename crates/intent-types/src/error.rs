//! Shared error taxonomy for the intent layer SDK (see the error-handling
//! design in the component notes). Each public error carries a stable
//! string code via [`ErrorCode`] so callers can match on identity rather
//! than on `Display` text.

pub use intent_crypto::error::ErrorCode;
use thiserror::Error;

/// Bad URL scheme, missing required field, non-hex hash, malformed DID.
/// Always terminal — never retried.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid URL scheme for {field}: {value} (insecure schemes require a loopback host or an explicit opt-out)")]
    InsecureUrl { field: &'static str, value: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} is not valid lowercase hex of length {expected_len}: {value}")]
    NotHex {
        field: &'static str,
        expected_len: usize,
        value: String,
    },

    #[error("malformed DID: {0}")]
    MalformedDid(String),

    #[error("{0}")]
    Other(String),
}

impl ErrorCode for ValidationError {
    fn code(&self) -> &'static str {
        match self {
            Self::InsecureUrl { .. } => "VALIDATION_INSECURE_URL",
            Self::MissingField(_) => "VALIDATION_MISSING_FIELD",
            Self::NotHex { .. } => "VALIDATION_NOT_HEX",
            Self::MalformedDid(_) => "VALIDATION_MALFORMED_DID",
            Self::Other(_) => "VALIDATION_OTHER",
        }
    }
}

/// Pinning-service failure: transport error, non-2xx response, or an
/// unparseable body. Retried only at the HTTP layer (see the pinner
/// client); once raised here, it is terminal for the caller.
#[derive(Error, Debug)]
pub enum PinningError {
    #[error("pinner request failed: {0}")]
    Request(String),

    #[error("pinner returned client error {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("pinner returned server error {status} after exhausting retries: {body}")]
    ServerError { status: u16, body: String },

    #[error("pinner response did not contain a usable cid")]
    MissingCid,
}

impl ErrorCode for PinningError {
    fn code(&self) -> &'static str {
        match self {
            Self::Request(_) => "PINNING_REQUEST_FAILED",
            Self::ClientError { .. } => "PINNING_CLIENT_ERROR",
            Self::ServerError { .. } => "PINNING_SERVER_ERROR",
            Self::MissingCid => "PINNING_MISSING_CID",
        }
    }
}

/// Malformed envelope, malformed CID, or wrong hash length. Terminal.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("envelope field {0} must not be empty")]
    EmptyField(&'static str),

    #[error("envelope hash must be 32 bytes of hex, optionally 0x-prefixed: {0}")]
    InvalidHash(String),

    #[error("cid is not valid hex and utf8 fallback was not permitted: {0}")]
    InvalidCid(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

impl ErrorCode for EnvelopeError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyField(_) => "ENVELOPE_EMPTY_FIELD",
            Self::InvalidHash(_) => "ENVELOPE_INVALID_HASH",
            Self::InvalidCid(_) => "ENVELOPE_INVALID_CID",
            Self::Canonicalization(_) => "ENVELOPE_CANONICALIZATION_FAILED",
            Self::Signing(_) => "ENVELOPE_SIGNING_FAILED",
        }
    }
}

/// Ledger RPC refused the request, or the connected chain ID does not
/// match the configured network.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("ledger RPC call {method} failed: {message}")]
    RpcFailed { method: String, message: String },

    #[error("chain id mismatch: configured {expected}, RPC reported {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

impl ErrorCode for NetworkError {
    fn code(&self) -> &'static str {
        match self {
            Self::RpcFailed { .. } => "NETWORK_RPC_FAILED",
            Self::ChainIdMismatch { .. } => "NETWORK_CHAIN_ID_MISMATCH",
            Self::UnknownNetwork(_) => "NETWORK_UNKNOWN",
        }
    }
}

/// Signing or broadcast failure for a ledger transaction.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error("timed out waiting for a receipt after {0}ms")]
    ReceiptTimeout(u64),
}

impl ErrorCode for TransactionError {
    fn code(&self) -> &'static str {
        match self {
            Self::GasEstimation(_) => "TRANSACTION_GAS_ESTIMATION_FAILED",
            Self::Signing(_) => "TRANSACTION_SIGNING_FAILED",
            Self::Broadcast(_) => "TRANSACTION_BROADCAST_FAILED",
            Self::ReceiptTimeout(_) => "TRANSACTION_RECEIPT_TIMEOUT",
        }
    }
}

/// The wire-level register-error taxonomy returned by the Gateway inside a
/// `TxReceipt`. Numeric values match the proto enum exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(i32)]
pub enum RegisterError {
    UnknownUnspecified = 0,
    DocCidEmpty = 1,
    AlreadyRegistered = 2,
    InvalidDid = 3,
    SchemaVersionMismatch = 4,
    InvalidOperator = 5,
    // Legacy values retained from the wire protocol this client targets;
    // not part of the originally enumerated block above.
    DidQuotaExceeded = 100,
    ProcessingError = 101,
    Unauthorized = 102,
    InvalidPayload = 103,
    InvalidDocCid = 104,
}

impl RegisterError {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::UnknownUnspecified,
            1 => Self::DocCidEmpty,
            2 => Self::AlreadyRegistered,
            3 => Self::InvalidDid,
            4 => Self::SchemaVersionMismatch,
            5 => Self::InvalidOperator,
            100 => Self::DidQuotaExceeded,
            101 => Self::ProcessingError,
            102 => Self::Unauthorized,
            103 => Self::InvalidPayload,
            104 => Self::InvalidDocCid,
            _ => Self::UnknownUnspecified,
        }
    }
}

/// Gateway-side failures. Most variants are logged and swallowed by
/// `ensure_registered` because the on-chain record, not the Gateway, is
/// authoritative — `QuotaExceededError` is the one exception and must
/// always reach the caller.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway connection error: {0}")]
    Connection(String),

    #[error("gateway response error: {0:?}")]
    Response(RegisterError),

    #[error("gateway call timed out")]
    Timeout,

    #[error("gateway quota exceeded for this DID or organization")]
    QuotaExceeded,

    #[error("DID is already registered")]
    AlreadyRegistered,

    /// `RESOURCE_EXHAUSTED` / `INTERNAL` / `UNKNOWN` transport codes: the
    /// server is presumed transiently unhealthy and this is always
    /// retried, regardless of the message text.
    #[error("gateway reported a transient server error: {0}")]
    Retryable(String),

    #[error("gateway error: {0}")]
    Other(String),
}

impl ErrorCode for GatewayError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "GATEWAY_CONNECTION_ERROR",
            Self::Response(_) => "GATEWAY_RESPONSE_ERROR",
            Self::Timeout => "GATEWAY_TIMEOUT",
            Self::QuotaExceeded => "GATEWAY_QUOTA_EXCEEDED",
            Self::AlreadyRegistered => "GATEWAY_ALREADY_REGISTERED",
            Self::Retryable(_) => "GATEWAY_RETRYABLE",
            Self::Other(_) => "GATEWAY_OTHER",
        }
    }
}

impl GatewayError {
    /// Whether this error represents a condition worth retrying at the
    /// client's backoff layer. `Connection` and `Retryable` always are;
    /// `Other` falls back to sniffing the message text for non-transport
    /// exceptions that carry no status code of their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Retryable(_) => true,
            Self::Other(message) => is_retryable_message(message),
            _ => false,
        }
    }
}

fn is_retryable_message(message: &str) -> bool {
    const MARKERS: &[&str] = &[
        "timeout",
        "unavailable",
        "resource",
        "temporary",
        "overloaded",
        "connection refused",
    ];
    let text = message.to_lowercase();
    MARKERS.iter().any(|marker| text.contains(marker))
}

/// A DID resolves on-chain with `active=false`.
#[derive(Error, Debug)]
#[error("DID {did} is inactive (owner {owner})")]
pub struct InactiveDIDError {
    pub did: String,
    pub owner: String,
}

impl ErrorCode for InactiveDIDError {
    fn code(&self) -> &'static str {
        "INACTIVE_DID"
    }
}

/// Registration attempted on a DID that already has an active owner.
#[derive(Error, Debug)]
#[error("DID is already registered to owner {owner}")]
pub struct AlreadyRegisteredError {
    pub owner: String,
}

impl ErrorCode for AlreadyRegisteredError {
    fn code(&self) -> &'static str {
        "ALREADY_REGISTERED"
    }
}

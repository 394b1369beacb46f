//! `GatewayClient`: the retrying, error-classifying `RegisterDid` caller.

use crate::stub::StubTransport;
use crate::transport::{GatewayCredentials, Transport};
use intent_types::error::{GatewayError, RegisterError};
use intent_types::{DidDocument, TxReceipt};
use rand::Rng;
use tokio::sync::Mutex;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

fn default_timeout() -> Duration {
    let seconds = std::env::var("INTENT_GW_TIMEOUT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(5);
    Duration::from_secs(seconds)
}

pub struct RegisterDidOptions {
    pub org_id: Option<String>,
    pub label: Option<String>,
    pub schema_version: u32,
    pub doc_cid: Option<String>,
    pub payload_cid: Option<String>,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub retry_timeout: Option<Duration>,
}

impl Default for RegisterDidOptions {
    fn default() -> Self {
        Self {
            org_id: None,
            label: None,
            schema_version: 2,
            doc_cid: None,
            payload_cid: None,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            retry_timeout: None,
        }
    }
}

/// The outcome of a single `register_did` attempt, already classified
/// into "done" or "retry".
enum AttemptOutcome {
    Done(Result<TxReceipt, GatewayError>),
    Retry(GatewayError),
}

/// A Gateway client wrapping a single [`Transport`]. Safe for concurrent
/// use — the underlying gRPC channel is multiplexable and the stub holds
/// no per-call mutable state.
pub struct GatewayClient {
    transport: Mutex<Box<dyn Transport>>,
    credentials: GatewayCredentials,
}

impl GatewayClient {
    pub fn new(transport: Box<dyn Transport>, credentials: GatewayCredentials) -> Self {
        Self {
            transport: Mutex::new(transport),
            credentials,
        }
    }

    /// Builds a client backed by the offline stub transport — always
    /// available, used when the proto/gRPC stack cannot be reached.
    pub fn stub(credentials: GatewayCredentials) -> Self {
        Self::new(Box::new(StubTransport::default()), credentials)
    }

    pub async fn register_did(
        &self,
        did: &str,
        pub_key: Vec<u8>,
        options: RegisterDidOptions,
    ) -> Result<TxReceipt, GatewayError> {
        let document = DidDocument {
            did: did.to_string(),
            pub_key,
            org_id: options.org_id.clone(),
            label: options.label.clone(),
            schema_version: options.schema_version,
            doc_cid: options.doc_cid.clone(),
            payload_cid: options.payload_cid.clone(),
        };

        let timeout = options.retry_timeout.unwrap_or_else(default_timeout);
        let total_attempts = options.max_retries + 1;

        for attempt in 1..=total_attempts {
            let outcome = self.attempt_once(&document, timeout).await;
            match outcome {
                AttemptOutcome::Done(result) => return result,
                AttemptOutcome::Retry(_) if attempt == total_attempts => {
                    return Err(GatewayError::Other(
                        "exhausted retries against the gateway".into(),
                    ))
                }
                AttemptOutcome::Retry(_) => {
                    let sleep_for = backoff_with_jitter(options.backoff_base, attempt);
                    tokio::time::sleep(sleep_for).await;
                }
            }
        }
        unreachable!("loop always returns on its final iteration")
    }

    async fn attempt_once(&self, document: &DidDocument, timeout: Duration) -> AttemptOutcome {
        let result = {
            let transport = self.transport.lock().await;
            transport.register_did(document, timeout, &self.credentials).await
        };

        match result {
            Ok(receipt) if receipt.success => AttemptOutcome::Done(Ok(receipt)),
            Ok(receipt) => classify_receipt_error(receipt),
            Err(GatewayError::QuotaExceeded) => {
                AttemptOutcome::Done(Err(GatewayError::QuotaExceeded))
            }
            Err(GatewayError::Timeout) => AttemptOutcome::Done(Err(GatewayError::Timeout)),
            Err(e) if e.is_retryable() => AttemptOutcome::Retry(e),
            Err(e) => AttemptOutcome::Done(Err(e)),
        }
    }
}

fn classify_receipt_error(receipt: TxReceipt) -> AttemptOutcome {
    match receipt.error_code {
        RegisterError::AlreadyRegistered => AttemptOutcome::Done(Ok(receipt)),
        RegisterError::DidQuotaExceeded => {
            intent_types::rate_limited_log::SHARED
                .warn_rate_limited("gateway reported DID_QUOTA_EXCEEDED");
            AttemptOutcome::Done(Err(GatewayError::QuotaExceeded))
        }
        RegisterError::InvalidDid
        | RegisterError::InvalidDocCid
        | RegisterError::Unauthorized
        | RegisterError::InvalidPayload => {
            AttemptOutcome::Done(Err(GatewayError::Response(receipt.error_code)))
        }
        _ => AttemptOutcome::Retry(GatewayError::Response(receipt.error_code)),
    }
}

/// `delay · 2^(attempt-1) · (1 + Uniform(0, 0.1))`.
fn backoff_with_jitter(base: Duration, attempt: u32) -> Duration {
    let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
    let delay = base.saturating_mul(exp);
    let jitter_fraction: f64 = rand::thread_rng().gen_range(0.0..0.1);
    delay.mul_f64(1.0 + jitter_fraction)
}

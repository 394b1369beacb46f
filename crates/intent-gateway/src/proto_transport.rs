//! The real gRPC transport, built on `tonic`.

use crate::pb::gateway_service_client::GatewayServiceClient;
use crate::pb::{self, RegisterDidRequest};
use crate::tls::{build_tls_config, parse_and_validate};
use crate::transport::{GatewayCredentials, Transport};
use async_trait::async_trait;
use intent_types::error::{GatewayError, RegisterError};
use intent_types::{DidDocument, TxReceipt};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

pub struct ProtoTransport {
    channel: Option<Channel>,
}

impl Default for ProtoTransport {
    fn default() -> Self {
        Self { channel: None }
    }
}

#[async_trait]
impl Transport for ProtoTransport {
    async fn initialize(&mut self, url: &str, verify_tls: bool) -> Result<(), GatewayError> {
        let endpoint_info = parse_and_validate(url).map_err(|e| GatewayError::Other(e.to_string()))?;

        let mut endpoint = Endpoint::from_shared(url.to_string())
            .map_err(|e| GatewayError::Other(e.to_string()))?
            .keep_alive_while_idle(true)
            .http2_keep_alive_interval(KEEPALIVE_INTERVAL)
            .keep_alive_timeout(KEEPALIVE_TIMEOUT)
            .tcp_keepalive(Some(KEEPALIVE_INTERVAL));

        if endpoint_info.secure && verify_tls {
            let tls_config =
                build_tls_config(&endpoint_info.host).map_err(|e| GatewayError::Other(e.to_string()))?;
            endpoint = endpoint
                .tls_config(tls_config)
                .map_err(|e| GatewayError::Other(e.to_string()))?;
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        self.channel = Some(channel);
        Ok(())
    }

    async fn register_did(
        &self,
        document: &DidDocument,
        timeout: Duration,
        credentials: &GatewayCredentials,
    ) -> Result<TxReceipt, GatewayError> {
        let channel = self
            .channel
            .clone()
            .ok_or_else(|| GatewayError::Other("transport not initialized".into()))?;
        let mut client = GatewayServiceClient::new(channel)
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE);

        let mut request = tonic::Request::new(RegisterDidRequest {
            document: Some(to_wire_document(document)),
        });
        request.set_timeout(timeout);
        for (key, value) in credentials.metadata_map() {
            if let (Ok(key), Ok(value)) = (
                tonic::metadata::MetadataKey::from_bytes(key.as_bytes()),
                value.parse(),
            ) {
                request.metadata_mut().insert(key, value);
            }
        }

        let response = client.register_did(request).await.map_err(classify_status)?;
        let receipt = response
            .into_inner()
            .receipt
            .ok_or_else(|| GatewayError::Other("response missing receipt".into()))?;
        Ok(from_wire_receipt(receipt))
    }

    async fn close(&mut self) {
        self.channel = None;
    }

    fn is_available(&self) -> bool {
        self.channel.is_some()
    }
}

fn classify_status(status: tonic::Status) -> GatewayError {
    match status.code() {
        Code::DeadlineExceeded => GatewayError::Timeout,
        Code::Unavailable => GatewayError::Connection(status.message().to_string()),
        // Always retryable per the transport's error-classification policy,
        // independent of whatever text happens to be in the message.
        Code::ResourceExhausted | Code::Internal | Code::Unknown => {
            GatewayError::Retryable(status.message().to_string())
        }
        _ => GatewayError::Other(status.message().to_string()),
    }
}

fn to_wire_document(document: &DidDocument) -> pb::DidDocument {
    pb::DidDocument {
        did: document.did.clone(),
        pub_key: document.pub_key.clone(),
        org_id: document.org_id.clone(),
        label: document.label.clone(),
        schema_version: document.schema_version,
        doc_cid: document.doc_cid.clone(),
        payload_cid: document.payload_cid.clone(),
    }
}

fn from_wire_receipt(receipt: pb::TxReceipt) -> TxReceipt {
    TxReceipt {
        hash: receipt.hash,
        gas_used: receipt.gas_used,
        success: receipt.success,
        error: receipt.error,
        error_code: RegisterError::from_i32(receipt.error_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_exhausted_internal_and_unknown_are_retryable_regardless_of_message() {
        for code in [Code::ResourceExhausted, Code::Internal, Code::Unknown] {
            let err = classify_status(tonic::Status::new(code, "internal server error"));
            assert!(matches!(err, GatewayError::Retryable(_)));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn unavailable_maps_to_connection_and_is_retryable() {
        let err = classify_status(tonic::Status::new(Code::Unavailable, "no route"));
        assert!(matches!(err, GatewayError::Connection(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn invalid_argument_is_not_retryable() {
        let err = classify_status(tonic::Status::new(Code::InvalidArgument, "bad request"));
        assert!(matches!(err, GatewayError::Other(_)));
        assert!(!err.is_retryable());
    }
}

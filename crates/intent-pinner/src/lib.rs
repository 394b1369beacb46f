//! Submits envelope payloads to a pinning service and returns their
//! content ID, retrying on server errors.

use intent_types::envelope::redact_for_log;
use intent_types::error::PinningError;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_SECS: f64 = 0.5;

pub struct PinnerClient {
    base_url: String,
    http: reqwest::Client,
}

impl PinnerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client with static config always builds"),
        }
    }

    /// POSTs `payload` to `<base_url>/pin` and returns the resulting CID.
    pub async fn pin(&self, payload: &Value) -> Result<String, PinningError> {
        let url = format!("{}/pin", self.base_url.trim_end_matches('/'));
        tracing::debug!(url = %url, payload = ?redact_for_log(payload.clone()), "pinning payload");

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let response = self.http.post(&url).json(payload).send().await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return parse_cid(response).await;
                    }
                    let body = response.text().await.unwrap_or_default();
                    if status.is_client_error() {
                        return Err(PinningError::ClientError {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    if attempt > MAX_RETRIES {
                        return Err(PinningError::ServerError {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(e) => {
                    if attempt > MAX_RETRIES {
                        return Err(PinningError::Request(e.to_string()));
                    }
                    tokio::time::sleep(backoff(attempt)).await;
                }
            }
        }
    }
}

async fn parse_cid(response: reqwest::Response) -> Result<String, PinningError> {
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    let body = response
        .text()
        .await
        .map_err(|e| PinningError::Request(e.to_string()))?;

    if !is_json {
        tracing::warn!("pinner response was not application/json, attempting to parse anyway");
    }

    let value: Value = serde_json::from_str(&body).map_err(|_| PinningError::MissingCid)?;
    value
        .get("cid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(PinningError::MissingCid)
}

fn backoff(attempt: u32) -> Duration {
    let secs = BACKOFF_BASE_SECS * 2f64.powi(attempt as i32 - 1);
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn successful_pin_returns_cid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/pin")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"cid":"bafy123"}"#)
            .create_async()
            .await;

        let client = PinnerClient::new(server.url());
        let cid = client.pin(&json!({"prompt_sha256": "abc"})).await.unwrap();
        assert_eq!(cid, "bafy123");
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pin")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let client = PinnerClient::new(server.url());
        let result = client.pin(&json!({})).await;
        assert!(matches!(result, Err(PinningError::ClientError { status: 400, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_exhausts_retries_then_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pin")
            .with_status(503)
            .expect(4)
            .create_async()
            .await;

        let client = PinnerClient::new(server.url());
        let result = client.pin(&json!({})).await;
        assert!(matches!(result, Err(PinningError::ServerError { status: 503, .. })));
        mock.assert_async().await;
    }
}

//! Payment service provider client.
//!
//! The matching/trip-lifecycle core treats the PSP as an opaque collaborator
//! with a `capture(amount, method) -> {ok|declined|error}` contract (§1);
//! this module is the one concrete implementation of that contract, an HTTP
//! client against an external PSP with the call-site deadline from §5.

use std::time::Duration;

use domain::models::payment::PspOutcome;
use domain::models::ride::PaymentMethod;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PspConfig;

/// HTTP client for the external payment service provider.
#[derive(Debug, Clone)]
pub struct PspClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct CaptureRequest {
    payment_id: Uuid,
    amount: f64,
    method: &'static str,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    status: String,
    #[serde(default)]
    reference: Option<String>,
}

impl PspClient {
    pub fn new(config: &PspConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Attempt to capture `amount` for `payment_id` via `method`.
    ///
    /// Returns `(outcome, psp_reference)`. Any transport failure, non-2xx
    /// response, or deadline overrun maps to `PspOutcome::Error` rather than
    /// propagating — the caller (trip-lifecycle finalize path) decides how
    /// to handle an indeterminate PSP result.
    pub async fn capture(
        &self,
        payment_id: Uuid,
        amount: f64,
        method: PaymentMethod,
    ) -> (PspOutcome, Option<String>) {
        let body = CaptureRequest {
            payment_id,
            amount,
            method: method.as_str(),
        };

        let request = self
            .http
            .post(format!("{}/v1/captures", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout);

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(%payment_id, error = %err, "PSP request failed");
                return (PspOutcome::Error, None);
            }
        };

        if !response.status().is_success() {
            tracing::warn!(%payment_id, status = %response.status(), "PSP returned non-success status");
            return (PspOutcome::Error, None);
        }

        match response.json::<CaptureResponse>().await {
            Ok(parsed) => {
                let outcome = match parsed.status.as_str() {
                    "ok" | "captured" => PspOutcome::Ok,
                    "declined" => PspOutcome::Declined,
                    _ => PspOutcome::Error,
                };
                (outcome, parsed.reference)
            }
            Err(err) => {
                tracing::warn!(%payment_id, error = %err, "PSP response body malformed");
                (PspOutcome::Error, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_carries_configured_timeout() {
        let config = PspConfig {
            base_url: "https://psp.example.com".into(),
            api_key: "key".into(),
            timeout_secs: 10,
        };
        let client = PspClient::new(&config);
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.base_url, "https://psp.example.com");
    }
}

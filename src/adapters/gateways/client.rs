//! HTTP plumbing shared by every processor family.

use std::time::Duration;

use secrecy::SecretString;
use serde::de::DeserializeOwned;

use crate::domain::gateway::{GatewayError, GatewayMode};

/// Longest processor error body echoed into a `GatewayError`.
const MAX_ERROR_BODY: usize = 300;

/// Decrypted credentials of one tenant gateway.
///
/// Only the registry builds these, right before constructing an adapter.
#[derive(Clone)]
pub struct ProcessorCredentials {
    pub api_key: SecretString,
    pub signing_secret: SecretString,
    pub public_key: Option<String>,
    pub merchant_id: Option<String>,
}

/// Where and how an adapter talks to its processor.
#[derive(Clone)]
pub struct ProcessorEndpoint {
    pub base_url: String,
    pub mode: GatewayMode,
    pub credentials: ProcessorCredentials,
}

impl ProcessorEndpoint {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// reqwest client with a bounded timeout, shared by all adapters.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::unavailable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { http })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends `request` and decodes a 2xx JSON body.
    ///
    /// Transport failures and timeouts become `processor_unavailable`;
    /// non-2xx statuses map through [`GatewayError::from_status`]; a 2xx body
    /// that does not decode is `request_rejected`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "processor returned an error status");
            return Err(GatewayError::from_status(
                status.as_u16(),
                format!("processor returned {}: {}", status, truncate(&body)),
            ));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| {
            GatewayError::rejected(format!("unreadable processor response: {}", e))
        })
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::unavailable("processor request timed out")
    } else {
        GatewayError::unavailable(format!("processor unreachable: {}", err))
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

//! HTTP client for the VIN record service
//!
//! API:
//! - Lookup: GET {endpoint}/api/check_vin?vin={VIN}
//! - Health: GET {endpoint}/
//! - Authentication: X-API-Key header

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::client::{VerificationClient, VerificationError};
use crate::models::{CheckVinResponse, VerificationConfig, VerificationResult, Vin};

const CHECK_VIN_PATH: &str = "/api/check_vin";
const API_KEY_HEADER: &str = "X-API-Key";

/// Result of probing the service root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHealth {
    pub healthy: bool,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: Option<String>,
    message: Option<String>,
}

/// reqwest-backed [`VerificationClient`]
pub struct HttpVerificationClient {
    /// Base URL without trailing slash
    endpoint: String,
    api_key: String,
    /// HTTP client (reused across requests)
    http_client: Client,
}

impl HttpVerificationClient {
    /// Create a client from connection settings
    ///
    /// # Errors
    /// Returns `Transport` if the underlying HTTP client cannot be built
    pub fn new(config: &VerificationConfig) -> Result<Self, VerificationError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VerificationError::Transport {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn check_vin_url(&self) -> String {
        format!("{}{}", self.endpoint, CHECK_VIN_PATH)
    }

    /// Probe the service root
    ///
    /// Any answer that is not a 200 with `"status": "healthy"` is reported as unhealthy;
    /// only a missing network path is an error.
    pub async fn health(&self) -> Result<ServiceHealth, VerificationError> {
        let response = self
            .http_client
            .get(format!("{}/", self.endpoint))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body: Option<HealthResponse> = response.json().await.ok();

        let (reported, message) = match body {
            Some(body) => (body.status, body.message),
            None => (None, None),
        };

        Ok(ServiceHealth {
            healthy: status == StatusCode::OK && reported.as_deref() == Some("healthy"),
            message,
        })
    }
}

#[async_trait]
impl VerificationClient for HttpVerificationClient {
    async fn verify(&self, vin: &Vin) -> Result<VerificationResult, VerificationError> {
        tracing::debug!("Requesting verification for {}", vin);

        let response = self
            .http_client
            .get(self.check_vin_url())
            .query(&[("vin", vin.as_str())])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(VerificationError::Server {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport_error)?;

        let parsed: CheckVinResponse =
            serde_json::from_slice(&body).map_err(|e| VerificationError::Decoding {
                message: e.to_string(),
            })?;

        Ok(parsed.into_result())
    }
}

fn transport_error(error: reqwest::Error) -> VerificationError {
    let message = if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    VerificationError::Transport { message }
}

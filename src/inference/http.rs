//! Hosted inference API backend over HTTPS.
//!
//! Sends `POST {url}` with a JSON body and a bearer token and maps failures
//! onto [`GenerationError`] classes:
//!
//! | Response | Class |
//! |----------|-------|
//! | 401 | `Auth` |
//! | 503 with a "loading" error payload | `ModelLoading` |
//! | other non-2xx | `HttpStatus` |
//! | client timeout | `Timeout` |
//! | connect/send/read failure | `Request` |
//! | 2xx non-JSON body | `Malformed` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::response::{error_details, normalize_body};
use super::{GenerationBackend, GenerationRequest};
use crate::config::{ApiConfig, EndpointConfig};
use crate::error::GenerationError;

/// Substring of the 503 error payload that marks a model still loading.
const LOADING_SIGNAL: &str = "loading";

/// HTTP backend for hosted text-generation endpoints.
pub struct HttpBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpBackend {
    /// Create a backend with the given bearer token and per-request timeout.
    ///
    /// The timeout is set on every request, so it holds even when the tuned
    /// client cannot be built.
    ///
    /// With `api_key == None` every call fails with [`GenerationError::Auth`]
    /// without touching the network.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build tuned HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            api_key,
            timeout,
        }
    }

    /// Upper bound applied to every request.
    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a backend from API settings, reading the key from the environment.
    pub fn from_config(api: &ApiConfig) -> Self {
        Self::new(api.resolve_api_key(), api.request_timeout())
    }

    /// Map a non-success status and its body to a failure class.
    fn map_http_error(status: StatusCode, body: &str) -> GenerationError {
        let (message, estimated_secs) = error_details(body);
        let message = message.unwrap_or_else(|| body.trim().to_owned());
        match status.as_u16() {
            401 => GenerationError::Auth(message),
            503 if message.to_lowercase().contains(LOADING_SIGNAL) => {
                GenerationError::ModelLoading {
                    message,
                    estimated_secs,
                }
            }
            code => GenerationError::HttpStatus {
                status: code,
                message,
            },
        }
    }

    fn map_transport_error(err: &reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(err.to_string())
        } else {
            GenerationError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate(
        &self,
        endpoint: &EndpointConfig,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::Auth(
                "no API key configured for the inference service".to_owned(),
            ));
        };

        debug!(endpoint = endpoint.name.as_str(), "sending generation request");
        let response = self
            .client
            .post(&endpoint.url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body));
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Malformed(format!("invalid JSON body: {e}")))?;

        Ok(normalize_body(value).unwrap_or_else(|| {
            warn!(
                endpoint = endpoint.name.as_str(),
                "unrecognized response shape, treating as empty reply"
            );
            String::new()
        }))
    }
}

//! Text-generation backends.
//!
//! A [`GenerationBackend`] performs one call against one ranked endpoint and
//! returns the normalized generated text or a classified
//! [`GenerationError`]. Fallback, retry and message mapping live above this
//! layer, in [`crate::generator`].

pub mod http;
pub mod response;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::EndpointConfig;
use crate::error::GenerationError;

pub use http::HttpBackend;

/// Sampling parameters sent alongside the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationParameters {
    /// Maximum number of generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling probability mass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Whether sampling is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
}

/// Request body for one endpoint call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// The full prompt.
    pub inputs: String,
    /// Optional sampling parameters; omitted from the body when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<GenerationParameters>,
}

impl GenerationRequest {
    /// Build the request for `endpoint`, taking its sampling parameters.
    pub fn for_endpoint(endpoint: &EndpointConfig, inputs: String) -> Self {
        let parameters = endpoint.has_parameters().then(|| GenerationParameters {
            max_new_tokens: endpoint.max_new_tokens,
            temperature: endpoint.temperature,
            top_p: endpoint.top_p,
            do_sample: endpoint.do_sample,
        });
        Self { inputs, parameters }
    }
}

/// One outbound text-generation call.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Send `request` to `endpoint` and return the generated text.
    ///
    /// A 2xx body whose shape is not recognized yields an empty string.
    async fn generate(
        &self,
        endpoint: &EndpointConfig,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError>;
}

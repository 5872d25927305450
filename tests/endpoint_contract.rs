//! Inference endpoint contract tests.
//!
//! Verify the HTTP request format sent by `HttpBackend` and the mapping of
//! response bodies and status codes onto generation results.

use std::time::Duration;

use devassist::config::EndpointConfig;
use devassist::inference::{GenerationBackend, GenerationRequest, HttpBackend};
use devassist::GenerationError;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend() -> HttpBackend {
    HttpBackend::new(Some("hf_test_token".into()), Duration::from_secs(5))
}

fn chat_endpoint(server: &MockServer) -> EndpointConfig {
    EndpointConfig::new("phi-3-mini", format!("{}/models/phi", server.uri()))
        .with_max_new_tokens(250)
        .with_temperature(0.7)
        .with_sampling(0.9)
}

async fn call(
    backend: &HttpBackend,
    endpoint: &EndpointConfig,
    inputs: &str,
) -> Result<String, GenerationError> {
    let request = GenerationRequest::for_endpoint(endpoint, inputs.to_owned());
    backend.generate(endpoint, &request).await
}

// ────────────────────────────────────────────────────────────────────────────
// Request format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_carries_bearer_token_and_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/phi"))
        .and(header("authorization", "Bearer hf_test_token"))
        .and(body_partial_json(json!({
            "inputs": "hello",
            "parameters": {"max_new_tokens": 250, "do_sample": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "hi"}])))
        .expect(1)
        .mount(&server)
        .await;

    let result = call(&backend(), &chat_endpoint(&server), "hello").await;
    assert_eq!(result, Ok("hi".into()));
}

#[tokio::test]
async fn test_parameters_omitted_when_endpoint_has_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/small"))
        .and(body_json(json!({"inputs": "brief answer please"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = EndpointConfig::new("flan-t5-small", format!("{}/models/small", server.uri()));
    let result = call(&backend(), &endpoint, "brief answer please").await;
    assert_eq!(result, Ok("ok".into()));
}

// ────────────────────────────────────────────────────────────────────────────
// Response bodies
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_object_body_is_returned_raw() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"generated_text": "<|assistant|>\nHello\n"})),
        )
        .mount(&server)
        .await;

    let result = call(&backend(), &chat_endpoint(&server), "hi").await;
    assert_eq!(result, Ok("<|assistant|>\nHello\n".into()));
}

#[tokio::test]
async fn test_unrecognized_shape_is_empty_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(42)))
        .mount(&server)
        .await;

    let result = call(&backend(), &chat_endpoint(&server), "hi").await;
    assert_eq!(result, Ok(String::new()));
}

#[tokio::test]
async fn test_non_json_success_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = call(&backend(), &chat_endpoint(&server), "hi").await;
    assert!(matches!(result, Err(GenerationError::Malformed(_))));
}

// ────────────────────────────────────────────────────────────────────────────
// Error classification
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Invalid credentials in Authorization header"})),
        )
        .mount(&server)
        .await;

    let err = call(&backend(), &chat_endpoint(&server), "hi")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "AUTH_FAILED");
}

#[tokio::test]
async fn test_loading_503_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Model microsoft/Phi-3-mini-4k-instruct is currently loading",
            "estimated_time": 20.0
        })))
        .mount(&server)
        .await;

    let err = call(&backend(), &chat_endpoint(&server), "hi")
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.code(), "MODEL_LOADING");
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let err = call(&backend(), &chat_endpoint(&server), "hi")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GenerationError::HttpStatus {
            status: 500,
            message: "internal".into()
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::new(Some("hf_test_token".into()), Duration::from_millis(200));
    let err = call(&backend, &chat_endpoint(&server), "hi")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TIMEOUT_ERROR");
}

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("unreachable")))
        .expect(0)
        .mount(&server)
        .await;

    let backend = HttpBackend::new(None, Duration::from_secs(5));
    let err = call(&backend, &chat_endpoint(&server), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Auth(_)));
}

//! End-to-end tests for the response generator against mock endpoints.

use std::sync::Arc;
use std::time::{Duration, Instant};

use devassist::config::{EndpointConfig, HistoryPolicy};
use devassist::connectivity::ConnectivityFlag;
use devassist::generator::messages;
use devassist::retry::RetryPolicy;
use devassist::{ChatSession, FailureKind, HttpBackend, ReplyOutcome, ResponseGenerator};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIMARY: &str = "/models/phi";
const LARGE: &str = "/models/large";
const SMALL: &str = "/models/small";

fn endpoints(server: &MockServer) -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::new("phi-3-mini", format!("{}{PRIMARY}", server.uri()))
            .with_max_new_tokens(250)
            .with_temperature(0.7)
            .with_sampling(0.9),
        EndpointConfig::new("flan-t5-large", format!("{}{LARGE}", server.uri()))
            .with_template("Provide specific, actionable advice for this question: {input}")
            .with_max_new_tokens(150)
            .with_temperature(0.7),
        EndpointConfig::new("flan-t5-small", format!("{}{SMALL}", server.uri()))
            .with_template("Give a brief helpful answer to: {input}"),
    ]
}

fn generator(server: &MockServer, retry_delay: Duration) -> ResponseGenerator {
    let backend = Arc::new(HttpBackend::new(
        Some("hf_test_token".into()),
        Duration::from_secs(5),
    ));
    ResponseGenerator::new(backend, endpoints(server)).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        delay: retry_delay,
    })
}

async fn respond_with(server: &MockServer, route: &str, template: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(template)
        .expect(times)
        .mount(server)
        .await;
}

fn loading() -> ResponseTemplate {
    ResponseTemplate::new(503).set_body_json(json!({
        "error": "Model microsoft/Phi-3-mini-4k-instruct is currently loading",
        "estimated_time": 20.0
    }))
}

#[tokio::test]
async fn test_empty_input_makes_no_calls() {
    let server = MockServer::start().await;
    respond_with(&server, PRIMARY, ResponseTemplate::new(200), 0).await;

    let reply = generator(&server, Duration::ZERO).respond_once("   ").await;
    assert_eq!(reply.text, messages::DIDNT_CATCH);
    assert_eq!(reply.outcome, ReplyOutcome::EmptyInput);
}

#[tokio::test]
async fn test_primary_reply_is_cleaned() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        PRIMARY,
        ResponseTemplate::new(200).set_body_json(json!({"generated_text": "<|assistant|>\nHello\n"})),
        1,
    )
    .await;

    let reply = generator(&server, Duration::ZERO).respond_once("hi").await;
    assert_eq!(reply.text, "Hello");
}

#[tokio::test]
async fn test_primary_failure_falls_back_once() {
    let server = MockServer::start().await;
    respond_with(&server, PRIMARY, ResponseTemplate::new(500), 1).await;
    Mock::given(method("POST"))
        .and(path(LARGE))
        .and(body_partial_json(json!({
            "inputs": "Provide specific, actionable advice for this question: how do I focus?"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"generated_text": "  Try the Pomodoro technique.  "}])),
        )
        .expect(1)
        .mount(&server)
        .await;
    respond_with(&server, SMALL, ResponseTemplate::new(200), 0).await;

    let reply = generator(&server, Duration::ZERO)
        .respond_once("how do I focus?")
        .await;
    assert_eq!(reply.text, "Try the Pomodoro technique.");
    assert_eq!(
        reply.outcome,
        ReplyOutcome::Generated {
            endpoint: "flan-t5-large".into(),
            rank: 1
        }
    );
}

#[tokio::test]
async fn test_loading_exhausts_retries_without_fallback() {
    let server = MockServer::start().await;
    respond_with(&server, PRIMARY, loading(), 3).await;
    respond_with(&server, LARGE, ResponseTemplate::new(200), 0).await;

    let delay = Duration::from_millis(50);
    let started = Instant::now();
    let reply = generator(&server, delay).respond_once("hello").await;

    assert_eq!(reply.text, messages::STILL_LOADING);
    assert_eq!(reply.outcome, ReplyOutcome::Failed(FailureKind::ModelLoading));
    assert!(started.elapsed() >= delay * 2);
}

#[tokio::test]
async fn test_unauthorized_stops_immediately() {
    let server = MockServer::start().await;
    respond_with(
        &server,
        PRIMARY,
        ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid token"})),
        1,
    )
    .await;
    respond_with(&server, LARGE, ResponseTemplate::new(200), 0).await;

    let reply = generator(&server, Duration::ZERO).respond_once("hello").await;
    assert_eq!(reply.text, messages::AUTHENTICATION);
}

#[tokio::test]
async fn test_all_endpoints_failing_apologizes() {
    let server = MockServer::start().await;
    respond_with(&server, PRIMARY, ResponseTemplate::new(500), 1).await;
    respond_with(&server, LARGE, ResponseTemplate::new(502), 1).await;
    respond_with(&server, SMALL, ResponseTemplate::new(500), 1).await;

    let reply = generator(&server, Duration::ZERO).respond_once("hello").await;
    assert_eq!(reply.text, messages::EXHAUSTED);
}

#[tokio::test]
async fn test_offline_host_reports_connection_problem() {
    let server = MockServer::start().await;
    respond_with(&server, PRIMARY, ResponseTemplate::new(500), 1).await;
    respond_with(&server, LARGE, ResponseTemplate::new(200), 0).await;

    let flag = ConnectivityFlag::new(false);
    let reply = generator(&server, Duration::ZERO)
        .with_connectivity(Arc::new(flag))
        .respond_once("hello")
        .await;
    assert_eq!(reply.text, messages::OFFLINE);
}

#[tokio::test]
async fn test_chat_session_sends_history_in_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRIMARY))
        .and(body_partial_json(json!({
            "inputs": "<|system|>\nBe brief.\n<|user|>\nfirst\n<|assistant|>\nOne.\n<|user|>\nsecond\n<|assistant|>"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("Two.")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRIMARY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("One.")))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator(&server, Duration::ZERO)
        .with_persona("Be brief.")
        .with_history_policy(HistoryPolicy::SuccessesOnly);
    let mut session = ChatSession::new(Arc::new(generator));

    assert_eq!(session.send("first").await.text, "One.");
    assert_eq!(session.send("second").await.text, "Two.");
    assert_eq!(session.conversation().turns().len(), 4);
}

//! Voice session tests: navigation interception, spoken replies, cancellation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use devassist::commands::Destination;
use devassist::config::{CaptureConfig, EndpointConfig};
use devassist::speech::{PlaybackOutcome, VoiceParams};
use devassist::{
    ChunkedSpeechPlayer, HttpBackend, PlaybackState, ResponseGenerator, SpeechSynthesizer,
    VoiceSession, VoiceTurn,
};
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records chunks; blocks on any chunk containing "hold" until cancelled.
#[derive(Default)]
struct RecordingSynth {
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynth {
    async fn speak(&self, text: &str, _params: &VoiceParams) -> devassist::Result<()> {
        self.spoken.lock().unwrap().push(text.to_owned());
        if text.contains("hold") {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn cancel(&self) {}
}

fn session(server: &MockServer, synth: Arc<RecordingSynth>) -> VoiceSession {
    let backend = Arc::new(HttpBackend::new(
        Some("hf_test_token".into()),
        Duration::from_secs(5),
    ));
    let endpoints = vec![EndpointConfig::new(
        "phi-3-mini",
        format!("{}/models/phi", server.uri()),
    )];
    let generator = Arc::new(ResponseGenerator::new(backend, endpoints));
    let player = Arc::new(ChunkedSpeechPlayer::new(synth, VoiceParams::default()));
    VoiceSession::new(generator, player, "Jarvis", &CaptureConfig::default())
}

#[tokio::test]
async fn test_navigation_phrase_never_calls_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = session(&server, Arc::new(RecordingSynth::default()));
    session.start_listening();
    session.push_result(0, "Jarvis go to ").unwrap();
    session.push_result(1, "Dashboard").unwrap();

    let turn = session.stop_listening().await;
    assert_eq!(
        turn,
        VoiceTurn::Navigated {
            destination: Destination::Dashboard,
            acknowledgement: "Navigating to Dashboard.",
        }
    );
}

#[tokio::test]
async fn test_reply_is_spoken_in_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!([{"generated_text": "<|assistant|>\nHello there. How are you? Great!"}]),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let synth = Arc::new(RecordingSynth::default());
    let mut session = session(&server, synth.clone());
    let turn = session.handle_utterance("Jarvis, say hi").await;
    assert!(matches!(turn, VoiceTurn::Replied(_)));

    assert_eq!(
        session.wait_for_playback().await,
        Some(PlaybackOutcome::Completed { chunks: 3 })
    );
    assert_eq!(
        *synth.spoken.lock().unwrap(),
        vec!["Hello there.", " How are you?", " Great!"]
    );
    assert_eq!(session.playback_state(), PlaybackState::default());
}

#[tokio::test]
async fn test_listening_interrupts_reading() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!("First part. Please hold. Never.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let synth = Arc::new(RecordingSynth::default());
    let mut session = session(&server, synth.clone());
    let mut state = session.subscribe_playback();

    session.handle_utterance("Jarvis, explain").await;
    state
        .wait_for(|s| s.is_reading && s.current_chunk_index == 1)
        .await
        .unwrap();

    session.start_listening();
    assert_eq!(
        session.wait_for_playback().await,
        Some(PlaybackOutcome::Cancelled { at: 1 })
    );
    assert_eq!(session.playback_state(), PlaybackState::default());
    assert_eq!(
        *synth.spoken.lock().unwrap(),
        vec!["First part.", " Please hold."]
    );
}

//! Chat and voice sessions.
//!
//! [`ChatSession`] owns one conversation and sends typed text through the
//! [`ResponseGenerator`]. [`VoiceSession`] layers speech capture, navigation
//! commands, wake-name gating and spoken replies on top of it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::capture::{
    CaptureOutcome, ListeningSession, NOTHING_HEARD, mentions_name, settle_transcript,
};
use crate::commands::{Destination, detect_navigation};
use crate::config::{AssistantConfig, CaptureConfig};
use crate::conversation::{Conversation, ConversationMessage};
use crate::error::Result;
use crate::generator::{Reply, ResponseGenerator};
use crate::speech::{ChunkedSpeechPlayer, PlaybackOutcome, PlaybackState};

/// One conversation with the assistant.
///
/// `send` takes `&mut self`, so a session has at most one request in flight.
#[derive(Debug)]
pub struct ChatSession {
    generator: Arc<ResponseGenerator>,
    conversation: Conversation,
}

impl ChatSession {
    /// Start a session seeded with the generator's persona.
    pub fn new(generator: Arc<ResponseGenerator>) -> Self {
        let conversation = generator.new_conversation();
        Self {
            generator,
            conversation,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.conversation.id()
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Send `text` and wait for the reply.
    pub async fn send(&mut self, text: &str) -> Reply {
        self.generator.respond(&mut self.conversation, text).await
    }

    /// Drop the history and start a fresh conversation.
    pub fn reset(&mut self) {
        self.conversation = self.generator.new_conversation();
        info!(session = %self.conversation.id(), "conversation reset");
    }
}

/// What a voice session did with a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceTurn {
    /// A navigation command was recognized; the generator was not called.
    Navigated {
        /// Where the host should go.
        destination: Destination,
        /// Acknowledgement shown to the user.
        acknowledgement: &'static str,
    },
    /// The transcript was answered and the reply is being spoken.
    Replied(Reply),
    /// Listening ended without speech.
    NothingHeard {
        /// Message shown to the user.
        message: &'static str,
    },
    /// An always-on transcript that did not address the assistant.
    Ignored,
}

/// Greeting that opens every voice session's transcript log.
pub fn greeting(name: &str) -> String {
    format!(
        "Hello! I'm {name}, your voice assistant. You can ask me questions or give me commands. Try saying 'What should I learn today?'"
    )
}

/// A voice conversation: capture, commands, replies and spoken output.
#[derive(Debug)]
pub struct VoiceSession {
    chat: ChatSession,
    player: Arc<ChunkedSpeechPlayer>,
    capture: ListeningSession,
    name: String,
    require_wake_name: bool,
    pause: Duration,
    last_settled: Option<String>,
    log: Vec<ConversationMessage>,
    playback: Option<JoinHandle<PlaybackOutcome>>,
}

impl VoiceSession {
    /// Create a session answering to `name`.
    pub fn new(
        generator: Arc<ResponseGenerator>,
        player: Arc<ChunkedSpeechPlayer>,
        name: impl Into<String>,
        capture: &CaptureConfig,
    ) -> Self {
        let name = name.into();
        let log = vec![ConversationMessage::assistant(greeting(&name))];
        Self {
            chat: ChatSession::new(generator),
            player,
            capture: ListeningSession::new(),
            name,
            require_wake_name: capture.require_wake_name,
            pause: capture.pause(),
            last_settled: None,
            log,
            playback: None,
        }
    }

    /// Create a session from the full configuration.
    pub fn from_config(
        config: &AssistantConfig,
        generator: Arc<ResponseGenerator>,
        player: Arc<ChunkedSpeechPlayer>,
    ) -> Self {
        Self::new(
            generator,
            player,
            config.assistant.name.clone(),
            &config.capture,
        )
    }

    /// The name the assistant answers to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Everything shown to the user, starting with the greeting.
    pub fn transcript_log(&self) -> &[ConversationMessage] {
        &self.log
    }

    /// The conversation sent to the model.
    pub fn conversation(&self) -> &Conversation {
        self.chat.conversation()
    }

    /// Whether speech results are being accepted.
    pub fn is_listening(&self) -> bool {
        self.capture.is_listening()
    }

    /// Start listening. Any reply being read aloud is stopped first.
    pub fn start_listening(&mut self) {
        self.stop_reading();
        self.capture.start();
    }

    /// Store recognition result `index` from the host recognizer.
    pub fn push_result(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        self.capture.set_result(index, text)
    }

    /// Live transcript while listening.
    pub fn live_transcript(&self) -> String {
        self.capture.transcript()
    }

    /// Stop listening and act on what was heard.
    pub async fn stop_listening(&mut self) -> VoiceTurn {
        match self.capture.stop() {
            CaptureOutcome::NothingHeard => VoiceTurn::NothingHeard {
                message: NOTHING_HEARD,
            },
            CaptureOutcome::Transcript(text) => self.process(&text, true).await,
        }
    }

    /// Wait for the next settled transcript on a live always-on stream and
    /// act on it.
    ///
    /// A transcript is settled once it has not changed for the configured
    /// capture pause. A settled transcript identical to the previous one is
    /// not processed again. Returns `None` once the stream has closed.
    pub async fn next_utterance(&mut self, live: &mut watch::Receiver<String>) -> Option<VoiceTurn> {
        loop {
            let transcript = settle_transcript(live, self.pause).await?;
            if self.last_settled.as_deref() == Some(transcript.as_str()) {
                live.changed().await.ok()?;
                continue;
            }
            self.last_settled = Some(transcript.clone());
            return Some(self.handle_utterance(&transcript).await);
        }
    }

    /// Act on a settled always-on transcript.
    ///
    /// Navigation commands are always handled. Anything else is forwarded to
    /// the generator only when it mentions the assistant's name or a
    /// conversation is already under way.
    pub async fn handle_utterance(&mut self, transcript: &str) -> VoiceTurn {
        if transcript.trim().is_empty() {
            return VoiceTurn::Ignored;
        }
        let addressed = !self.require_wake_name
            || mentions_name(transcript, &self.name)
            || self.log.len() > 1;
        self.process(transcript, addressed).await
    }

    async fn process(&mut self, transcript: &str, addressed: bool) -> VoiceTurn {
        if let Some(destination) = detect_navigation(transcript) {
            info!(route = destination.route(), "navigation command");
            let acknowledgement = destination.acknowledgement();
            self.log.push(ConversationMessage::user(transcript));
            self.log.push(ConversationMessage::assistant(acknowledgement));
            return VoiceTurn::Navigated {
                destination,
                acknowledgement,
            };
        }

        if !addressed {
            debug!("transcript not addressed to assistant, ignoring");
            return VoiceTurn::Ignored;
        }

        self.stop_reading();
        self.log.push(ConversationMessage::user(transcript));
        let reply = self.chat.send(transcript).await;
        self.log.push(ConversationMessage::assistant(reply.text.clone()));
        self.speak(reply.text.clone());
        VoiceTurn::Replied(reply)
    }

    fn speak(&mut self, text: String) {
        let player = self.player.clone();
        self.playback = Some(tokio::spawn(async move { player.play(&text).await }));
    }

    /// Stop reading the current reply aloud.
    pub fn stop_reading(&mut self) {
        self.player.stop();
    }

    /// Wait for the reply being read aloud, if any, to finish.
    pub async fn wait_for_playback(&mut self) -> Option<PlaybackOutcome> {
        let handle = self.playback.take()?;
        handle.await.ok()
    }

    /// Current playback state.
    pub fn playback_state(&self) -> PlaybackState {
        self.player.state()
    }

    /// Subscribe to playback state changes.
    pub fn subscribe_playback(&self) -> watch::Receiver<PlaybackState> {
        self.player.subscribe()
    }

    /// End the session: stop listening and stop any speech.
    pub fn close(&mut self) {
        if self.capture.is_listening() {
            let _ = self.capture.stop();
        }
        self.stop_reading();
        info!(session = %self.chat.id(), "voice session closed");
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.player.stop();
    }
}

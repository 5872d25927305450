//! Speech-to-text capture adapter.
//!
//! The host owns the recognizer and pushes results into a
//! [`ListeningSession`]. When listening stops, the accumulated transcript is
//! either handed on or reported as [`CaptureOutcome::NothingHeard`].

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{AssistError, Result};

/// Reply used when a listening session ends without any speech.
pub const NOTHING_HEARD: &str = "I didn't hear anything. Please try speaking again.";

/// How far past the last stored result a new result index may land.
const MAX_RESULT_GAP: usize = 16;

/// Result of ending a listening session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Non-blank transcript.
    Transcript(String),
    /// Nothing but silence or whitespace was recognized.
    NothingHeard,
}

/// Accumulates recognition results while listening.
#[derive(Debug, Default)]
pub struct ListeningSession {
    results: Vec<String>,
    listening: bool,
}

impl ListeningSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin listening, discarding any previous transcript.
    pub fn start(&mut self) {
        self.results.clear();
        self.listening = true;
        debug!("listening started");
    }

    /// Whether results are being accepted.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Store recognition result `index`, replacing any earlier interim text
    /// for the same index.
    ///
    /// Indices more than a few slots past the current results are rejected.
    pub fn set_result(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        if !self.listening {
            return Err(AssistError::Capture(
                "recognition result received while not listening".to_owned(),
            ));
        }
        let limit = self.results.len().saturating_add(MAX_RESULT_GAP);
        if index > limit {
            return Err(AssistError::Capture(format!(
                "recognition result index {index} is beyond {limit}"
            )));
        }
        if index >= self.results.len() {
            self.results.resize(index + 1, String::new());
        }
        self.results[index] = text.into();
        Ok(())
    }

    /// Concatenation of all results so far.
    pub fn transcript(&self) -> String {
        self.results.concat()
    }

    /// Stop listening and take the transcript.
    pub fn stop(&mut self) -> CaptureOutcome {
        self.listening = false;
        let transcript = self.transcript();
        self.results.clear();
        if transcript.trim().is_empty() {
            debug!("listening stopped with empty transcript");
            CaptureOutcome::NothingHeard
        } else {
            debug!(chars = transcript.len(), "listening stopped");
            CaptureOutcome::Transcript(transcript)
        }
    }
}

/// Whether `transcript` addresses the assistant by `name`, ignoring case.
pub fn mentions_name(transcript: &str, name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || transcript.to_lowercase().contains(&name.to_lowercase())
}

/// Wait until the live transcript in `rx` is non-blank and has not changed
/// for `pause`, then return it.
///
/// Returns `None` if the sender goes away before anything was heard.
pub async fn settle_transcript(
    rx: &mut watch::Receiver<String>,
    pause: Duration,
) -> Option<String> {
    loop {
        let current = rx.borrow_and_update().clone();
        match tokio::time::timeout(pause, rx.changed()).await {
            Err(_) if !current.trim().is_empty() => return Some(current),
            Err(_) => {}
            Ok(Ok(())) => {}
            Ok(Err(_closed)) => {
                return (!current.trim().is_empty()).then_some(current);
            }
        }
    }
}

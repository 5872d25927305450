//! Sequential chunk playback with cancellation.
//!
//! [`ChunkedSpeechPlayer`] speaks a reply one chunk at a time and publishes
//! its progress on a `watch` channel. At most one utterance is active per
//! player: starting a new one stops the previous one first.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::chunker::split_into_chunks;
use super::synth::{SpeechSynthesizer, VoiceParams};

/// Observable playback progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    /// A chunk is being spoken.
    pub is_reading: bool,
    /// Index of the chunk being spoken; `0` when idle.
    pub current_chunk_index: usize,
}

/// How a call to [`ChunkedSpeechPlayer::play`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every chunk was spoken.
    Completed {
        /// Number of chunks spoken.
        chunks: usize,
    },
    /// Playback was stopped while chunk `at` was current.
    Cancelled {
        /// Chunk index at cancellation.
        at: usize,
    },
    /// The host has no speech output; nothing was spoken.
    Unavailable,
    /// The synthesizer failed on chunk `at`.
    Failed {
        /// Chunk index that failed.
        at: usize,
        /// Synthesizer error.
        message: String,
    },
}

struct Active {
    generation: u64,
    cancel: CancellationToken,
}

/// Speaks text chunk by chunk through a [`SpeechSynthesizer`].
pub struct ChunkedSpeechPlayer {
    synth: Arc<dyn SpeechSynthesizer>,
    params: VoiceParams,
    state_tx: watch::Sender<PlaybackState>,
    active: Mutex<Active>,
}

impl std::fmt::Debug for ChunkedSpeechPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedSpeechPlayer")
            .field("params", &self.params)
            .field("state", &self.state())
            .finish()
    }
}

impl ChunkedSpeechPlayer {
    /// Create an idle player.
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, params: VoiceParams) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::default());
        Self {
            synth,
            params,
            state_tx,
            active: Mutex::new(Active {
                generation: 0,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Subscribe to playback state changes.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        *self.state_tx.borrow()
    }

    /// Whether the synthesizer can speak on this host.
    pub fn is_available(&self) -> bool {
        self.synth.is_available()
    }

    fn active(&self) -> MutexGuard<'_, Active> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Speak `text`, resolving when every chunk has been spoken or playback
    /// was stopped.
    pub async fn play(&self, text: &str) -> PlaybackOutcome {
        if !self.synth.is_available() {
            debug!("speech synthesis unavailable, skipping playback");
            return PlaybackOutcome::Unavailable;
        }

        let (generation, cancel) = self.begin();

        let chunks = split_into_chunks(text);
        debug!(generation, chunks = chunks.len(), "starting playback");

        for (index, chunk) in chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                return PlaybackOutcome::Cancelled { at: index };
            }
            self.publish(
                generation,
                PlaybackState {
                    is_reading: true,
                    current_chunk_index: index,
                },
            );

            let spoken = tokio::select! {
                result = self.synth.speak(chunk, &self.params) => Some(result),
                () = cancel.cancelled() => None,
            };

            match spoken {
                None => {
                    info!(at = index, "playback cancelled");
                    return PlaybackOutcome::Cancelled { at: index };
                }
                Some(Err(e)) => {
                    warn!(at = index, error = %e, "speech synthesis failed");
                    self.publish(generation, PlaybackState::default());
                    return PlaybackOutcome::Failed {
                        at: index,
                        message: e.to_string(),
                    };
                }
                Some(Ok(())) => {}
            }
        }

        self.publish(generation, PlaybackState::default());
        PlaybackOutcome::Completed {
            chunks: chunks.len(),
        }
    }

    /// Stop playback immediately. No further chunk starts after this returns.
    pub fn stop(&self) {
        let mut active = self.active();
        self.supersede(&mut active);
    }

    /// Stop any active playback and claim a fresh generation for a new one,
    /// under a single lock so concurrent callers never share a generation.
    fn begin(&self) -> (u64, CancellationToken) {
        let mut active = self.active();
        self.supersede(&mut active);
        (active.generation, active.cancel.clone())
    }

    fn supersede(&self, active: &mut Active) {
        active.cancel.cancel();
        active.generation += 1;
        active.cancel = CancellationToken::new();
        self.synth.cancel();
        self.state_tx.send_replace(PlaybackState::default());
    }

    /// Publish `state` only if `generation` is still the active playback.
    fn publish(&self, generation: u64, state: PlaybackState) {
        let active = self.active();
        if active.generation == generation {
            self.state_tx.send_replace(state);
        }
    }
}

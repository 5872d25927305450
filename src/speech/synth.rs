//! Speech synthesizer backends.
//!
//! [`SpeechSynthesizer`] speaks one chunk at a time and resolves when the
//! engine finishes it. `cancel()` stops whatever is being spoken right now.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SpeechOutputConfig;
use crate::error::{AssistError, Result};

/// Words per minute `say` uses at rate 1.0.
const SAY_BASE_WPM: f32 = 175.0;
/// Words per minute `espeak` uses at rate 1.0.
const ESPEAK_BASE_WPM: f32 = 170.0;

/// Rate, pitch and volume applied to every chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Speaking rate multiplier.
    pub rate: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Volume in `[0.0, 1.0]`.
    pub volume: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl From<&SpeechOutputConfig> for VoiceParams {
    fn from(config: &SpeechOutputConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

/// A text-to-speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether the host can produce speech at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Speak `text`, resolving when the engine has finished or was cancelled.
    async fn speak(&self, text: &str, params: &VoiceParams) -> Result<()>;

    /// Stop the utterance in progress, if any.
    fn cancel(&self);
}

/// Synthesizer for hosts without speech output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NullSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str, _params: &VoiceParams) -> Result<()> {
        Ok(())
    }

    fn cancel(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Say,
    Espeak,
    Other,
}

impl CommandKind {
    fn of(program: &str) -> Self {
        let stem = Path::new(program)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(program);
        match stem {
            "say" => Self::Say,
            "espeak" | "espeak-ng" => Self::Espeak,
            _ => Self::Other,
        }
    }
}

/// Speaks through a system TTS program (`say`, `espeak`), one process per chunk.
#[derive(Debug)]
pub struct CommandSynthesizer {
    program: String,
    kind: CommandKind,
    cancel: Mutex<CancellationToken>,
}

impl CommandSynthesizer {
    /// Use `program` for every chunk.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let kind = CommandKind::of(&program);
        Self {
            program,
            kind,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Find a known TTS program on `PATH`.
    pub fn detect() -> Option<Self> {
        ["say", "espeak-ng", "espeak"]
            .into_iter()
            .find(|program| which::which(program).is_ok())
            .map(Self::new)
    }

    /// The program this synthesizer runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn args(&self, text: &str, params: &VoiceParams) -> Vec<String> {
        let mut args = match self.kind {
            CommandKind::Say => vec![
                "-r".to_owned(),
                format!("{}", (SAY_BASE_WPM * params.rate).round() as u32),
            ],
            CommandKind::Espeak => vec![
                "-s".to_owned(),
                format!("{}", (ESPEAK_BASE_WPM * params.rate).round() as u32),
                "-p".to_owned(),
                format!("{}", (params.pitch * 50.0).clamp(0.0, 99.0).round() as u32),
                "-a".to_owned(),
                format!("{}", (params.volume * 100.0).clamp(0.0, 200.0).round() as u32),
            ],
            CommandKind::Other => Vec::new(),
        };
        args.push(text.to_owned());
        args
    }

    fn current_token(&self) -> CancellationToken {
        match self.cancel.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, params: &VoiceParams) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let token = self.current_token();
        if token.is_cancelled() {
            return Ok(());
        }

        let mut child = Command::new(&self.program)
            .args(self.args(text, params))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AssistError::Speech(format!("failed to start {}: {e}", self.program)))?;

        let finished = tokio::select! {
            status = child.wait() => Some(status),
            () = token.cancelled() => None,
        };

        match finished {
            Some(status) => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(AssistError::Speech(format!(
                        "{} exited with {status}",
                        self.program
                    )))
                }
            }
            None => {
                debug!(program = self.program.as_str(), "speech cancelled, killing process");
                let _ = child.start_kill();
                Ok(())
            }
        }
    }

    fn cancel(&self) {
        let mut token = match self.cancel.lock() {
            Ok(token) => token,
            Err(poisoned) => poisoned.into_inner(),
        };
        token.cancel();
        *token = CancellationToken::new();
    }
}

/// Pick a synthesizer for `config`: the configured command, else a detected
/// system program, else [`NullSynthesizer`].
pub fn synthesizer_from_config(config: &SpeechOutputConfig) -> Arc<dyn SpeechSynthesizer> {
    if let Some(program) = config.command.as_deref() {
        info!(program, "using configured speech command");
        return Arc::new(CommandSynthesizer::new(program));
    }
    match CommandSynthesizer::detect() {
        Some(synth) => {
            info!(program = synth.program(), "using system speech command");
            Arc::new(synth)
        }
        None => {
            info!("no speech command found, speech output disabled");
            Arc::new(NullSynthesizer)
        }
    }
}

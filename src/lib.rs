//! DevAssist: conversational learning and productivity assistant.
//!
//! Text or speech goes in, a spoken or displayed reply comes out:
//! Capture → Commands → Generator → Speech
//!
//! # Architecture
//!
//! - **Capture**: accumulates host speech-recognition results
//! - **Commands**: intercepts navigation phrases before any model call
//! - **Generator**: ranked hosted text-generation endpoints with retry on
//!   the primary and cascading fallback; every failure becomes a fixed
//!   user-facing message
//! - **Speech**: splits replies into sentence chunks and reads them aloud
//!   through a cancellable player

pub mod assistant;
pub mod capture;
pub mod commands;
pub mod config;
pub mod connectivity;
pub mod conversation;
pub mod error;
pub mod generator;
pub mod inference;
pub mod prompt;
pub mod retry;
pub mod speech;

pub use assistant::{ChatSession, VoiceSession, VoiceTurn};
pub use config::AssistantConfig;
pub use error::{AssistError, GenerationError, Result};
pub use generator::{FailureKind, Reply, ReplyOutcome, ResponseGenerator};
pub use inference::{GenerationBackend, HttpBackend};
pub use speech::{ChunkedSpeechPlayer, PlaybackState, SpeechSynthesizer};

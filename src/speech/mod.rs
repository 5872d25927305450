//! Speech output: sentence chunking, synthesizer backends and the chunked
//! player that drives them.

pub mod chunker;
pub mod player;
pub mod synth;

pub use chunker::split_into_chunks;
pub use player::{ChunkedSpeechPlayer, PlaybackOutcome, PlaybackState};
pub use synth::{
    CommandSynthesizer, NullSynthesizer, SpeechSynthesizer, VoiceParams, synthesizer_from_config,
};

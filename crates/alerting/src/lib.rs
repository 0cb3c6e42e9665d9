//! Alerting System
//!
//! Turns the current alert level into audio tones and spoken warnings,
//! with per-level cadence, repeat throttling, and graceful degradation
//! when no output device is present.

mod audio;
mod config;
mod scheduler;
mod throttle;
pub mod tone;

pub use audio::{
    select_voice, AudioSink, NullAudioSink, NullSpeech, SpeechSynth, TracingAudioSink,
    TracingSpeech, Utterance, Voice, VoicePreference,
};
pub use config::{AlertConfig, AlertPattern, AlertProfile};
pub use scheduler::{AlertScheduler, PlayOutcome, SchedulerState};
pub use throttle::PlayThrottle;

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("Invalid alert profile: {0}")]
    InvalidProfile(String),

    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    #[error("Speech synthesis unavailable")]
    SpeechUnavailable,
}

//! Audio and speech output capabilities
//!
//! Output devices are optional. Sinks report unavailability through
//! [`AlertError`]; the player logs it and carries on.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::tone::ToneEvent;
use crate::AlertError;

/// Tone output device
pub trait AudioSink: Send + Sync {
    fn play_tone(&self, tone: &ToneEvent) -> Result<(), AlertError>;
}

/// Speech synthesis backend
pub trait SpeechSynth: Send + Sync {
    /// Voices the backend can use right now
    fn voices(&self) -> Vec<Voice>;

    fn speak(&self, utterance: &Utterance) -> Result<(), AlertError>;

    /// Drop any utterance in progress
    fn cancel(&self);
}

/// A synthesized voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 tag, e.g. "en-US"
    pub language: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Voice selection preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicePreference {
    /// Exact voice name to use when available
    pub name: Option<String>,
    /// Language prefix, e.g. "en"
    pub language: String,
    pub rate: f32,
    pub volume: f32,
}

impl Default for VoicePreference {
    fn default() -> Self {
        Self {
            name: None,
            language: "en".to_string(),
            rate: 1.0,
            volume: 1.0,
        }
    }
}

/// A phrase ready to be spoken
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub volume: f32,
}

/// Pick the best available voice: named match, then language match,
/// then the backend default, then anything at all
pub fn select_voice(available: &[Voice], preference: &VoicePreference) -> Option<Voice> {
    let language = preference.language.to_ascii_lowercase();

    preference
        .name
        .as_ref()
        .and_then(|name| available.iter().find(|v| &v.name == name))
        .or_else(|| {
            available
                .iter()
                .filter(|v| v.language.to_ascii_lowercase().starts_with(&language))
                .max_by_key(|v| v.is_default)
        })
        .or_else(|| available.iter().find(|v| v.is_default))
        .or_else(|| available.first())
        .cloned()
}

/// Logs tones instead of sounding them
#[derive(Debug, Default)]
pub struct TracingAudioSink;

impl AudioSink for TracingAudioSink {
    fn play_tone(&self, tone: &ToneEvent) -> Result<(), AlertError> {
        info!(
            target: "alert_audio",
            offset_ms = tone.offset.as_millis() as u64,
            frequency_hz = tone.frequency_hz,
            duration_ms = tone.duration.as_millis() as u64,
            volume = tone.volume,
            "tone"
        );
        Ok(())
    }
}

/// No audio hardware
#[derive(Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play_tone(&self, _tone: &ToneEvent) -> Result<(), AlertError> {
        Err(AlertError::AudioUnavailable("no audio output".into()))
    }
}

/// Logs utterances instead of speaking them
#[derive(Debug, Default)]
pub struct TracingSpeech;

impl SpeechSynth for TracingSpeech {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            name: "log".to_string(),
            language: "en-US".to_string(),
            is_default: true,
        }]
    }

    fn speak(&self, utterance: &Utterance) -> Result<(), AlertError> {
        let voice = utterance.voice.as_ref().map_or("default", |v| v.name.as_str());
        info!(target: "alert_speech", voice, rate = utterance.rate, "{}", utterance.text);
        Ok(())
    }

    fn cancel(&self) {}
}

/// No speech synthesis
#[derive(Debug, Default)]
pub struct NullSpeech;

impl SpeechSynth for NullSpeech {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&self, _utterance: &Utterance) -> Result<(), AlertError> {
        Err(AlertError::SpeechUnavailable)
    }

    fn cancel(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, language: &str, is_default: bool) -> Voice {
        Voice {
            name: name.to_string(),
            language: language.to_string(),
            is_default,
        }
    }

    #[test]
    fn named_voice_wins() {
        let voices = vec![voice("Anna", "de-DE", true), voice("Samantha", "en-US", false)];
        let preference = VoicePreference {
            name: Some("Anna".into()),
            ..Default::default()
        };
        assert_eq!(select_voice(&voices, &preference).unwrap().name, "Anna");
    }

    #[test]
    fn language_match_prefers_default() {
        let voices = vec![
            voice("Anna", "de-DE", true),
            voice("Daniel", "en-GB", false),
            voice("Samantha", "en-US", true),
        ];
        let preference = VoicePreference::default();
        assert_eq!(select_voice(&voices, &preference).unwrap().name, "Samantha");
    }

    #[test]
    fn falls_back_to_backend_default() {
        let voices = vec![voice("Thomas", "fr-FR", false), voice("Anna", "de-DE", true)];
        let preference = VoicePreference {
            name: Some("Missing".into()),
            ..Default::default()
        };
        assert_eq!(select_voice(&voices, &preference).unwrap().name, "Anna");
    }

    #[test]
    fn no_voices_means_none() {
        assert!(select_voice(&[], &VoicePreference::default()).is_none());
    }

    #[test]
    fn null_backends_report_unavailable() {
        let tone = crate::tone::render(
            &crate::AlertProfile::default().minor,
            None,
        )
        .tones
        .remove(0);
        assert!(NullAudioSink.play_tone(&tone).is_err());
        assert!(NullSpeech.voices().is_empty());
    }
}

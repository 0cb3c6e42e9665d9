//! Per-level alert configuration

use dms::AlertLevel;
use serde::{Deserialize, Serialize};

use crate::AlertError;

/// How many tones one alert instance plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPattern {
    #[default]
    Single,
    Double,
    Triple,
    /// Ascending three-step sweep, optionally followed by speech
    Continuous,
}

/// Tone and cadence for one alert level
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    pub tone_frequency_hz: f32,
    pub tone_duration_sec: f32,
    /// 0-1
    pub volume: f32,
    pub pattern: AlertPattern,
    pub repeat_interval_ms: u64,
}

impl AlertConfig {
    /// Level 0: no tone, no repeat
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn is_silent(&self) -> bool {
        self.tone_frequency_hz <= 0.0 || self.tone_duration_sec <= 0.0 || self.volume <= 0.0
    }
}

/// Alert table for levels 1-3 plus the spoken warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertProfile {
    pub minor: AlertConfig,
    pub moderate: AlertConfig,
    pub critical: AlertConfig,
    /// Phrase spoken during a continuous pattern
    pub spoken_phrase: String,
    /// Lowest level whose continuous pattern includes speech
    pub speech_level: AlertLevel,
}

impl Default for AlertProfile {
    fn default() -> Self {
        Self {
            minor: AlertConfig {
                tone_frequency_hz: 600.0,
                tone_duration_sec: 0.2,
                volume: 0.3,
                pattern: AlertPattern::Single,
                repeat_interval_ms: 10_000,
            },
            moderate: AlertConfig {
                tone_frequency_hz: 800.0,
                tone_duration_sec: 0.25,
                volume: 0.5,
                pattern: AlertPattern::Double,
                repeat_interval_ms: 6_000,
            },
            critical: AlertConfig {
                tone_frequency_hz: 1000.0,
                tone_duration_sec: 0.3,
                volume: 0.8,
                pattern: AlertPattern::Continuous,
                repeat_interval_ms: 3_000,
            },
            spoken_phrase: "Warning. Signs of severe fatigue detected. Please pull over and rest."
                .to_string(),
            speech_level: AlertLevel::Critical,
        }
    }
}

impl AlertProfile {
    /// Configuration for a level; Normal is always silent
    pub fn get(&self, level: AlertLevel) -> AlertConfig {
        match level {
            AlertLevel::Normal => AlertConfig::silent(),
            AlertLevel::Minor => self.minor.clone(),
            AlertLevel::Moderate => self.moderate.clone(),
            AlertLevel::Critical => self.critical.clone(),
        }
    }

    /// Speech accompanies the continuous pattern at or above `speech_level`
    pub fn phrase_for(&self, level: AlertLevel) -> Option<&str> {
        let config = match level {
            AlertLevel::Normal => return None,
            AlertLevel::Minor => &self.minor,
            AlertLevel::Moderate => &self.moderate,
            AlertLevel::Critical => &self.critical,
        };
        if level >= self.speech_level
            && config.pattern == AlertPattern::Continuous
            && !self.spoken_phrase.trim().is_empty()
        {
            Some(self.spoken_phrase.as_str())
        } else {
            None
        }
    }

    /// Every alerting level must be audible, repeat, and escalate with severity
    pub fn validate(&self) -> Result<(), AlertError> {
        let levels = [
            (AlertLevel::Minor, &self.minor),
            (AlertLevel::Moderate, &self.moderate),
            (AlertLevel::Critical, &self.critical),
        ];

        for (level, config) in levels {
            if config.is_silent() {
                return Err(AlertError::InvalidProfile(format!(
                    "level {} has no audible tone",
                    level
                )));
            }
            if config.volume > 1.0 {
                return Err(AlertError::InvalidProfile(format!(
                    "level {} volume {} exceeds 1.0",
                    level, config.volume
                )));
            }
            if config.repeat_interval_ms == 0 {
                return Err(AlertError::InvalidProfile(format!(
                    "level {} has no repeat interval",
                    level
                )));
            }
        }

        for pair in levels.windows(2) {
            let (lower_level, lower) = pair[0];
            let (higher_level, higher) = pair[1];
            if higher.tone_frequency_hz < lower.tone_frequency_hz || higher.volume < lower.volume {
                return Err(AlertError::InvalidProfile(format!(
                    "level {} must not be quieter or lower-pitched than level {}",
                    higher_level, lower_level
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        assert!(AlertProfile::default().validate().is_ok());
    }

    #[test]
    fn normal_level_is_silent() {
        let profile = AlertProfile::default();
        let config = profile.get(AlertLevel::Normal);
        assert!(config.is_silent());
        assert_eq!(config.repeat_interval_ms, 0);
    }

    #[test]
    fn severity_raises_pitch_and_volume() {
        let profile = AlertProfile::default();
        let minor = profile.get(AlertLevel::Minor);
        let critical = profile.get(AlertLevel::Critical);
        assert!(critical.tone_frequency_hz > minor.tone_frequency_hz);
        assert!(critical.volume > minor.volume);
        assert!(critical.repeat_interval_ms < minor.repeat_interval_ms);
    }

    #[test]
    fn only_critical_speaks_by_default() {
        let profile = AlertProfile::default();
        assert!(profile.phrase_for(AlertLevel::Critical).is_some());
        assert!(profile.phrase_for(AlertLevel::Moderate).is_none());
        assert!(profile.phrase_for(AlertLevel::Normal).is_none());
    }

    #[test]
    fn rejects_decreasing_volume() {
        let mut profile = AlertProfile::default();
        profile.critical.volume = 0.1;
        assert!(matches!(profile.validate(), Err(AlertError::InvalidProfile(_))));
    }

    #[test]
    fn rejects_missing_interval() {
        let mut profile = AlertProfile::default();
        profile.minor.repeat_interval_ms = 0;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn deserializes_partial_profile() {
        let profile: AlertProfile = serde_json::from_str(
            r#"{"moderate":{"tone_frequency_hz":850.0,"tone_duration_sec":0.2,"volume":0.6,"pattern":"triple","repeat_interval_ms":5000},"speech_level":2}"#,
        )
        .unwrap();
        assert_eq!(profile.moderate.pattern, AlertPattern::Triple);
        assert_eq!(profile.speech_level, AlertLevel::Moderate);
        assert_eq!(profile.minor, AlertProfile::default().minor);
    }
}

//! Layered settings: defaults, optional TOML file, `FATIGUE_` environment

use std::path::Path;

use alerting::{AlertProfile, VoicePreference};
use config::{Config, ConfigError, Environment, File};
use dms::{DmsConfig, EstimatorMode};
use serde::{Deserialize, Serialize};

/// Settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "fatigue-monitor";

/// Where tones and speech go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioBackend {
    /// Report tones and phrases through the log
    #[default]
    Log,
    /// No output device
    None,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON log records instead of text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulated random walk or landmark frames on stdin
    pub mode: EstimatorMode,
    /// Feed levels to the alert scheduler
    pub alerts_enabled: bool,
    pub audio: AudioBackend,
    /// Stop after this many readings
    pub max_ticks: Option<u64>,
    pub log: LogSettings,
    pub dms: DmsConfig,
    pub alerts: AlertProfile,
    pub voice: VoicePreference,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: EstimatorMode::default(),
            alerts_enabled: true,
            audio: AudioBackend::default(),
            max_ticks: None,
            log: LogSettings::default(),
            dms: DmsConfig::default(),
            alerts: AlertProfile::default(),
            voice: VoicePreference::default(),
        }
    }
}

impl Settings {
    /// Load settings; an explicit `path` must exist, the default file may not
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::with_name(DEFAULT_SETTINGS_FILE).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix("FATIGUE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

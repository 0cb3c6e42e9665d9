//! Fatigue readings, alert levels and one-tick alerts

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Discrete fatigue severity, serialized as 0-3
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AlertLevel {
    #[default]
    Normal = 0,
    Minor = 1,
    Moderate = 2,
    Critical = 3,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Normal,
        AlertLevel::Minor,
        AlertLevel::Moderate,
        AlertLevel::Critical,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_alerting(self) -> bool {
        self != AlertLevel::Normal
    }
}

impl From<AlertLevel> for u8 {
    fn from(level: AlertLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for AlertLevel {
    type Error = DmsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AlertLevel::Normal),
            1 => Ok(AlertLevel::Minor),
            2 => Ok(AlertLevel::Moderate),
            3 => Ok(AlertLevel::Critical),
            other => Err(DmsError::InvalidLevel(other)),
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Minor => "minor",
            AlertLevel::Moderate => "moderate",
            AlertLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// DMS alert types raised for a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DmsAlert {
    /// Eyes closed long enough for an audible cue (throttled)
    DrowsinessTone,

    /// First drowsiness notice of a closed-eye episode
    DrowsinessNotice,

    /// A yawn was completed on this frame
    Yawn,

    /// Face not visible for a sustained period (camera blocked?)
    FaceNotVisible,
}

/// Landmark-derived metrics of one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceMetrics {
    pub ear: f32,
    pub mar: f32,
    /// Percentage of closed-eye frames this session
    pub perclos: f32,
    /// Blinks per minute
    pub blink_rate: f32,
    pub total_blinks: u64,
    pub yawn_count: u32,
}

/// Simulated dashboard vitals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub heart_rate_bpm: f32,
    /// 0-100
    pub stress_index: f32,
}

/// Which input source produced a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorMode {
    #[default]
    Simulated,
    Vision,
}

/// Output of one estimator tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueReading {
    /// 0-100
    pub fatigue_score: u8,
    pub alert_level: AlertLevel,
    pub face_detected: bool,
    pub timestamp_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metrics: Option<FaceMetrics>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vitals: Option<Vitals>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alerts: Vec<DmsAlert>,
}

impl FatigueReading {
    /// Safe default for a tick without a tracked face
    pub fn no_face(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trips_through_u8() {
        for level in AlertLevel::ALL {
            assert_eq!(AlertLevel::try_from(level.as_u8()).unwrap(), level);
        }
        assert!(matches!(AlertLevel::try_from(4), Err(DmsError::InvalidLevel(4))));
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(AlertLevel::Normal < AlertLevel::Minor);
        assert!(AlertLevel::Moderate < AlertLevel::Critical);
        assert!(!AlertLevel::Normal.is_alerting());
        assert!(AlertLevel::Minor.is_alerting());
    }

    #[test]
    fn reading_serializes_camel_case_with_numeric_level() {
        let reading = FatigueReading {
            fatigue_score: 62,
            alert_level: AlertLevel::Moderate,
            face_detected: true,
            timestamp_ms: 1000,
            alerts: vec![DmsAlert::DrowsinessTone],
            ..Default::default()
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["fatigueScore"], 62);
        assert_eq!(json["alertLevel"], 2);
        assert_eq!(json["alerts"][0], "drowsinessTone");
        assert!(json.get("metrics").is_none());
    }

    #[test]
    fn out_of_range_level_fails_to_deserialize() {
        let result: Result<AlertLevel, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }
}

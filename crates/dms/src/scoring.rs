//! Weighted fatigue score and alert-level thresholds
//!
//! Each indicator is mapped to a 0-100 sub-score, then combined:
//! - PERCLOS: 40%
//! - Instantaneous EAR: 30%
//! - Yawns: 20%
//! - Low blink rate: 10%

use crate::analysis::AlertLevel;
use crate::config::DmsConfig;

const PERCLOS_WEIGHT: f32 = 0.4;
const EAR_WEIGHT: f32 = 0.3;
const YAWN_WEIGHT: f32 = 0.2;
const BLINK_WEIGHT: f32 = 0.1;

/// Gain applied to the normalized EAR deficit
const EAR_GAIN: f32 = 150.0;
/// Ceiling of the blink sub-score
const BLINK_GAIN: f32 = 80.0;

/// Inputs to the composite score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreInputs {
    pub perclos: f32,
    pub ear: f32,
    pub yawn_count: u32,
    pub blink_rate: f32,
}

pub fn perclos_score(perclos: f32, config: &DmsConfig) -> f32 {
    (perclos / config.perclos_saturation_pct * 100.0).clamp(0.0, 100.0)
}

pub fn ear_score(ear: f32, config: &DmsConfig) -> f32 {
    let threshold = config.ear_closed_threshold;
    if ear < threshold {
        ((threshold - ear) / threshold * EAR_GAIN).min(100.0)
    } else {
        0.0
    }
}

pub fn yawn_score(yawn_count: u32, config: &DmsConfig) -> f32 {
    (yawn_count as f32 / config.yawn_saturation as f32 * 100.0).min(100.0)
}

pub fn blink_score(blink_rate: f32, config: &DmsConfig) -> f32 {
    let normal = config.normal_blink_rate;
    if blink_rate < normal {
        ((normal - blink_rate) / normal * BLINK_GAIN).min(100.0)
    } else {
        0.0
    }
}

/// Composite fatigue score, rounded to an integer in 0-100
pub fn fatigue_score(inputs: &ScoreInputs, config: &DmsConfig) -> u8 {
    let raw = PERCLOS_WEIGHT * perclos_score(inputs.perclos, config)
        + EAR_WEIGHT * ear_score(inputs.ear, config)
        + YAWN_WEIGHT * yawn_score(inputs.yawn_count, config)
        + BLINK_WEIGHT * blink_score(inputs.blink_rate, config);
    raw.round().clamp(0.0, 100.0) as u8
}

/// Highest-severity rule that matches wins
pub fn alert_level(score: f32, ear: f32, config: &DmsConfig) -> AlertLevel {
    if score > config.critical_score || ear < config.ear_blink_threshold {
        AlertLevel::Critical
    } else if score > config.moderate_score || ear < config.ear_closed_threshold {
        AlertLevel::Moderate
    } else if score > config.minor_score || ear < config.ear_minor_threshold {
        AlertLevel::Minor
    } else {
        AlertLevel::Normal
    }
}

/// Step function used by the simulated estimator
pub fn simulated_level(fatigue: f32) -> AlertLevel {
    if fatigue > 80.0 {
        AlertLevel::Critical
    } else if fatigue > 60.0 {
        AlertLevel::Moderate
    } else if fatigue > 40.0 {
        AlertLevel::Minor
    } else {
        AlertLevel::Normal
    }
}

//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::landmarks::LandmarkLayout;

/// What happens to the session counters when the tracked face is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceLossPolicy {
    /// Keep PERCLOS, blink and yawn tallies across brief occlusion
    #[default]
    Persist,
    /// Start a fresh session on the next detected face
    Reset,
}

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// EAR below this counts the frame as eyes closed
    pub ear_closed_threshold: f32,

    /// EAR below this counts toward a blink run
    pub ear_blink_threshold: f32,

    /// EAR below this raises at least a minor alert
    pub ear_minor_threshold: f32,

    /// MAR above this counts toward a yawn
    pub mar_yawn_threshold: f32,

    /// Consecutive closed frames before the drowsiness cue fires
    pub drowsy_streak_frames: u32,

    /// Consecutive open-mouth frames that make one yawn
    pub yawn_streak_frames: u32,

    /// Shortest closed run (frames) counted as a blink
    pub blink_min_frames: u32,

    /// Longest closed run (frames) counted as a blink
    pub blink_max_frames: u32,

    /// PERCLOS percentage that saturates the PERCLOS sub-score
    pub perclos_saturation_pct: f32,

    /// Yawn count that saturates the yawn sub-score
    pub yawn_saturation: u32,

    /// Blinks per minute below which the blink sub-score starts rising
    pub normal_blink_rate: f32,

    /// Assumed camera frame rate, used to extrapolate blink rate
    pub frame_rate_hz: f32,

    /// Minimum spacing between drowsiness cues (milliseconds)
    pub drowsiness_cue_interval_ms: u64,

    /// Score thresholds for Minor, Moderate and Critical levels
    pub minor_score: f32,
    pub moderate_score: f32,
    pub critical_score: f32,

    /// Consecutive no-face ticks before reporting the face as not visible
    pub face_absent_alert_frames: u32,

    /// Counter handling on face loss
    pub face_loss: FaceLossPolicy,

    /// Landmark index layout of the upstream tracker
    pub layout: LandmarkLayout,

    /// Synthetic input used when no landmark feed exists
    pub simulation: SimulationConfig,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_closed_threshold: 0.21,
            ear_blink_threshold: 0.18,
            ear_minor_threshold: 0.24,
            mar_yawn_threshold: 0.6,
            drowsy_streak_frames: 20,
            yawn_streak_frames: 15,
            blink_min_frames: 2,
            blink_max_frames: 5,
            perclos_saturation_pct: 30.0,
            yawn_saturation: 5,
            normal_blink_rate: 15.0,
            frame_rate_hz: 30.0,
            drowsiness_cue_interval_ms: 3000,
            minor_score: 25.0,
            moderate_score: 50.0,
            critical_score: 75.0,
            face_absent_alert_frames: 30,
            face_loss: FaceLossPolicy::default(),
            layout: LandmarkLayout::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl DmsConfig {
    /// Create strict config (earlier eye-closure alerts)
    pub fn strict() -> Self {
        Self {
            ear_closed_threshold: 0.23,
            ear_blink_threshold: 0.20,
            ear_minor_threshold: 0.26,
            drowsy_streak_frames: 15,
            drowsiness_cue_interval_ms: 2000,
            ..Default::default()
        }
    }

    /// Create lenient config (tolerates narrower eyes)
    pub fn lenient() -> Self {
        Self {
            ear_closed_threshold: 0.19,
            ear_blink_threshold: 0.16,
            ear_minor_threshold: 0.22,
            drowsy_streak_frames: 30,
            drowsiness_cue_interval_ms: 5000,
            ..Default::default()
        }
    }

    /// Check that thresholds are ordered and positive
    pub fn validate(&self) -> Result<(), crate::DmsError> {
        use crate::DmsError;

        if !(self.ear_blink_threshold < self.ear_closed_threshold
            && self.ear_closed_threshold < self.ear_minor_threshold)
        {
            return Err(DmsError::Config(format!(
                "EAR thresholds must satisfy blink < closed < minor, got {} / {} / {}",
                self.ear_blink_threshold, self.ear_closed_threshold, self.ear_minor_threshold
            )));
        }
        if self.ear_closed_threshold <= 0.0 || self.mar_yawn_threshold <= 0.0 {
            return Err(DmsError::Config("aspect-ratio thresholds must be positive".into()));
        }
        if self.blink_min_frames > self.blink_max_frames {
            return Err(DmsError::Config(format!(
                "blink frame range [{}, {}] is empty",
                self.blink_min_frames, self.blink_max_frames
            )));
        }
        if self.frame_rate_hz <= 0.0 || self.perclos_saturation_pct <= 0.0 || self.yawn_saturation == 0 {
            return Err(DmsError::Config("rates and saturation points must be positive".into()));
        }
        if !(self.minor_score < self.moderate_score && self.moderate_score < self.critical_score) {
            return Err(DmsError::Config("score thresholds must be increasing".into()));
        }
        self.simulation.validate()
    }
}

/// Random-walk parameters for the simulated estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fatigue at session start (0-100)
    pub initial_fatigue: f32,

    /// Maximum symmetric random step per tick
    pub step: f32,

    /// Constant upward drift added every tick
    pub upward_drift: f32,

    /// Resting heart rate the walk is pulled toward (bpm)
    pub resting_heart_rate: f32,

    /// Milliseconds represented by one tick
    pub tick_period_ms: u64,

    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_fatigue: 20.0,
            step: 3.0,
            upward_drift: 0.5,
            resting_heart_rate: 70.0,
            tick_period_ms: 1000,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Reject walk parameters the random step cannot sample from
    pub fn validate(&self) -> Result<(), crate::DmsError> {
        let fields = [
            ("initial_fatigue", self.initial_fatigue),
            ("step", self.step),
            ("upward_drift", self.upward_drift),
            ("resting_heart_rate", self.resting_heart_rate),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(crate::DmsError::Config(format!(
                "simulation {} must be finite, got {}",
                name, value
            )));
        }
        if self.tick_period_ms == 0 {
            return Err(crate::DmsError::Config("simulation tick period must be positive".into()));
        }
        Ok(())
    }
}

//! Driver Monitoring System (DMS)
//!
//! Fatigue estimation from facial landmarks:
//! - Eye Aspect Ratio (closed eyes, blinks)
//! - Mouth Aspect Ratio (yawns)
//! - PERCLOS over the session
//! - Weighted fatigue score and four-level alert state
//!
//! A simulated estimator covers sessions without a landmark feed.

pub mod analysis;
pub mod config;
pub mod landmarks;
pub mod scoring;
pub mod simulation;
pub mod state;

pub use analysis::{AlertLevel, DmsAlert, EstimatorMode, FaceMetrics, FatigueReading, Vitals};
pub use config::{DmsConfig, FaceLossPolicy, SimulationConfig};
pub use landmarks::{FrameLandmarks, LandmarkLayout, Point3};
pub use simulation::SimulatedEstimator;
pub use state::FatigueState;

use thiserror::Error;
use tracing::{debug, info, warn};

use scoring::ScoreInputs;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Landmark {index} missing (frame has {available} points)")]
    KeypointsMissing { index: usize, available: usize },

    #[error("Degenerate landmark geometry: {0} collapsed")]
    DegenerateGeometry(&'static str),

    #[error("Alert level {0} outside 0-3")]
    InvalidLevel(u8),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Source of per-tick fatigue readings
pub trait FatigueEstimator {
    /// Advance one tick; `None` (or a frame without points) means no face
    fn process(&mut self, frame: Option<&FrameLandmarks>) -> Result<FatigueReading, DmsError>;

    /// Discard session history
    fn reset(&mut self);

    fn mode(&self) -> EstimatorMode;
}

/// Landmark-driven fatigue estimator
pub struct VisionEstimator {
    config: DmsConfig,
    state: FatigueState,
    /// Consecutive ticks without a face
    face_absent_frames: u32,
    last_timestamp_ms: u64,
}

impl VisionEstimator {
    /// Create a new estimator with configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            "Vision estimator using {:?} layout, face loss policy {:?}",
            config.layout, config.face_loss
        );
        Ok(Self {
            config,
            state: FatigueState::default(),
            face_absent_frames: 0,
            last_timestamp_ms: 0,
        })
    }

    pub fn state(&self) -> &FatigueState {
        &self.state
    }

    fn face_lost(&mut self, timestamp_ms: u64) -> FatigueReading {
        self.face_absent_frames = self.face_absent_frames.saturating_add(1);

        if self.config.face_loss == FaceLossPolicy::Reset && self.state != FatigueState::default() {
            debug!("Face lost, resetting session counters");
            self.state.reset();
        }

        let mut reading = FatigueReading::no_face(timestamp_ms);
        if self.face_absent_frames == self.config.face_absent_alert_frames {
            warn!("Face not visible for {} frames", self.face_absent_frames);
            reading.alerts.push(DmsAlert::FaceNotVisible);
        }
        reading
    }

    fn update_state(&mut self, ear: f32, mar: f32, timestamp_ms: u64) -> Vec<DmsAlert> {
        let config = &self.config;
        let state = &mut self.state;
        let mut alerts = Vec::new();

        state.total_frames += 1;

        // Closed eyes, drowsiness cue after a sustained streak
        if ear < config.ear_closed_threshold {
            state.ear_below_streak += 1;
            state.closed_eye_frames += 1;

            if state.ear_below_streak >= config.drowsy_streak_frames {
                let cue_due = state.last_alert_tone_ms.map_or(true, |last| {
                    timestamp_ms.saturating_sub(last) >= config.drowsiness_cue_interval_ms
                });
                if cue_due {
                    warn!(
                        "Eyes closed for {} frames (EAR {:.3})",
                        state.ear_below_streak, ear
                    );
                    state.last_alert_tone_ms = Some(timestamp_ms);
                    alerts.push(DmsAlert::DrowsinessTone);
                }
                if !state.drowsiness_notified {
                    state.drowsiness_notified = true;
                    alerts.push(DmsAlert::DrowsinessNotice);
                }
            }
        } else {
            state.ear_below_streak = 0;
            state.drowsiness_notified = false;
        }

        // Blinks: short sub-threshold runs only
        if ear < config.ear_blink_threshold {
            state.blink_run_length += 1;
        } else if state.blink_run_length > 0 {
            let run = state.blink_run_length;
            if (config.blink_min_frames..=config.blink_max_frames).contains(&run) {
                state.total_blinks += 1;
                debug!("Blink counted ({} frames)", run);
            }
            state.blink_run_length = 0;
        }

        // Yawns: the streak restarts after each credit
        if mar > config.mar_yawn_threshold {
            state.mar_above_streak += 1;
            if state.mar_above_streak >= config.yawn_streak_frames {
                state.yawn_count += 1;
                state.mar_above_streak = 0;
                debug!("Yawn counted (total {})", state.yawn_count);
                alerts.push(DmsAlert::Yawn);
            }
        } else {
            state.mar_above_streak = 0;
        }

        alerts
    }
}

impl FatigueEstimator for VisionEstimator {
    fn process(&mut self, frame: Option<&FrameLandmarks>) -> Result<FatigueReading, DmsError> {
        let frame = match frame {
            Some(frame) if frame.has_face() => frame,
            other => {
                let timestamp_ms = other.map_or(self.last_timestamp_ms, |f| f.timestamp_ms);
                return Ok(self.face_lost(timestamp_ms));
            }
        };

        // Geometry first so a malformed frame leaves the counters untouched
        let ear = self.config.layout.average_ear(frame)?;
        let mar = self.config.layout.mar(frame)?;

        self.face_absent_frames = 0;
        self.last_timestamp_ms = frame.timestamp_ms;

        let alerts = self.update_state(ear, mar, frame.timestamp_ms);

        let perclos = self.state.perclos();
        let blink_rate = self.state.blink_rate(self.config.frame_rate_hz);
        let inputs = ScoreInputs {
            perclos,
            ear,
            yawn_count: self.state.yawn_count,
            blink_rate,
        };
        let fatigue_score = scoring::fatigue_score(&inputs, &self.config);
        let alert_level = scoring::alert_level(fatigue_score as f32, ear, &self.config);

        Ok(FatigueReading {
            fatigue_score,
            alert_level,
            face_detected: true,
            timestamp_ms: frame.timestamp_ms,
            metrics: Some(FaceMetrics {
                ear,
                mar,
                perclos,
                blink_rate,
                total_blinks: self.state.total_blinks,
                yawn_count: self.state.yawn_count,
            }),
            vitals: None,
            alerts,
        })
    }

    /// Reset driver state (on driver change or camera stop)
    fn reset(&mut self) {
        info!("Resetting vision estimator");
        self.state.reset();
        self.face_absent_frames = 0;
        self.last_timestamp_ms = 0;
    }

    fn mode(&self) -> EstimatorMode {
        EstimatorMode::Vision
    }
}

//! Simulated fatigue source for sessions without a camera feed

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::analysis::{EstimatorMode, FatigueReading, Vitals};
use crate::config::SimulationConfig;
use crate::landmarks::FrameLandmarks;
use crate::{scoring, DmsError, FatigueEstimator};

const MIN_HEART_RATE: f32 = 55.0;
const MAX_HEART_RATE: f32 = 110.0;
/// Fraction of the gap to the target heart rate closed each tick
const HEART_RATE_PULL: f32 = 0.1;
const HEART_RATE_JITTER: f32 = 2.0;

/// Random-walk fatigue generator
///
/// Fatigue drifts upward with symmetric noise and is clamped to 0-100.
/// Heart rate wanders around a target that rises with fatigue, and the
/// stress index blends fatigue with heart-rate elevation.
pub struct SimulatedEstimator<R: Rng = StdRng> {
    config: SimulationConfig,
    rng: R,
    fatigue: f32,
    heart_rate: f32,
    ticks: u64,
}

impl SimulatedEstimator<StdRng> {
    /// Seeded from `config.seed` when present, otherwise from OS entropy
    pub fn new(config: SimulationConfig) -> Result<Self, DmsError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> SimulatedEstimator<R> {
    pub fn with_rng(config: SimulationConfig, rng: R) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            "Simulated estimator starting at fatigue {:.1}",
            config.initial_fatigue
        );
        Ok(Self {
            fatigue: config.initial_fatigue.clamp(0.0, 100.0),
            heart_rate: config.resting_heart_rate.clamp(MIN_HEART_RATE, MAX_HEART_RATE),
            config,
            rng,
            ticks: 0,
        })
    }

    /// Current unrounded fatigue
    pub fn fatigue(&self) -> f32 {
        self.fatigue
    }

    /// Advance the walk by one tick
    pub fn step(&mut self) -> f32 {
        let step = self.config.step.abs();
        let noise = if step > 0.0 {
            self.rng.gen_range(-step..=step)
        } else {
            0.0
        };
        self.fatigue = (self.fatigue + noise + self.config.upward_drift).clamp(0.0, 100.0);

        let target = self.config.resting_heart_rate + self.fatigue * 0.2;
        let jitter = self.rng.gen_range(-HEART_RATE_JITTER..=HEART_RATE_JITTER);
        self.heart_rate = (self.heart_rate + (target - self.heart_rate) * HEART_RATE_PULL + jitter)
            .clamp(MIN_HEART_RATE, MAX_HEART_RATE);

        self.ticks += 1;
        self.fatigue
    }

    fn vitals(&self) -> Vitals {
        let span = (MAX_HEART_RATE - self.config.resting_heart_rate).max(1.0);
        let elevation =
            ((self.heart_rate - self.config.resting_heart_rate) / span * 100.0).clamp(0.0, 100.0);
        Vitals {
            heart_rate_bpm: self.heart_rate,
            stress_index: (0.6 * self.fatigue + 0.4 * elevation).clamp(0.0, 100.0),
        }
    }
}

impl<R: Rng> FatigueEstimator for SimulatedEstimator<R> {
    fn process(&mut self, _frame: Option<&FrameLandmarks>) -> Result<FatigueReading, DmsError> {
        let fatigue = self.step();
        let alert_level = scoring::simulated_level(fatigue);
        debug!("Simulated fatigue {:.1} -> {}", fatigue, alert_level);

        Ok(FatigueReading {
            fatigue_score: fatigue.round() as u8,
            alert_level,
            face_detected: true,
            timestamp_ms: self.ticks * self.config.tick_period_ms,
            metrics: None,
            vitals: Some(self.vitals()),
            alerts: Vec::new(),
        })
    }

    fn reset(&mut self) {
        self.fatigue = self.config.initial_fatigue.clamp(0.0, 100.0);
        self.heart_rate = self
            .config
            .resting_heart_rate
            .clamp(MIN_HEART_RATE, MAX_HEART_RATE);
        self.ticks = 0;
    }

    fn mode(&self) -> EstimatorMode {
        EstimatorMode::Simulated
    }
}

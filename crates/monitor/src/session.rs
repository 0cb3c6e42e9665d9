//! One monitoring session: estimator plus alert scheduler

use std::sync::Arc;

use alerting::{
    AlertScheduler, AudioSink, NullAudioSink, NullSpeech, PlayOutcome, SpeechSynth,
    TracingAudioSink, TracingSpeech,
};
use dms::{
    AlertLevel, DmsAlert, EstimatorMode, FatigueEstimator, FatigueReading, FrameLandmarks,
    SimulatedEstimator, VisionEstimator,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::settings::{AudioBackend, Settings};

/// Totals reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub readings: u64,
    pub peak_level: AlertLevel,
    pub alerts_played: u64,
}

pub struct Session {
    id: Uuid,
    mode: EstimatorMode,
    estimator: Box<dyn FatigueEstimator + Send>,
    scheduler: AlertScheduler,
    alerts_enabled: bool,
    readings: u64,
    peak_level: AlertLevel,
}

impl Session {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let estimator: Box<dyn FatigueEstimator + Send> = match settings.mode {
            EstimatorMode::Simulated => {
                Box::new(SimulatedEstimator::new(settings.dms.simulation.clone())?)
            }
            EstimatorMode::Vision => Box::new(VisionEstimator::new(settings.dms.clone())?),
        };

        let (audio, speech): (Arc<dyn AudioSink>, Arc<dyn SpeechSynth>) = match settings.audio {
            AudioBackend::Log => (Arc::new(TracingAudioSink), Arc::new(TracingSpeech)),
            AudioBackend::None => (Arc::new(NullAudioSink), Arc::new(NullSpeech)),
        };
        let scheduler = AlertScheduler::new(
            settings.alerts.clone(),
            audio,
            speech,
            settings.voice.clone(),
        )?;

        Ok(Self {
            id: Uuid::new_v4(),
            mode: settings.mode,
            estimator,
            scheduler,
            alerts_enabled: settings.alerts_enabled,
            readings: 0,
            peak_level: AlertLevel::Normal,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> EstimatorMode {
        self.mode
    }

    /// Process one tick and drive the scheduler with the resulting level
    pub async fn handle(&mut self, frame: Option<&FrameLandmarks>) -> FatigueReading {
        let reading = match self.estimator.process(frame) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Frame dropped: {}", e);
                FatigueReading::no_face(frame.map_or(0, |f| f.timestamp_ms))
            }
        };

        for alert in &reading.alerts {
            match alert {
                DmsAlert::DrowsinessTone if self.alerts_enabled => {
                    let outcome = self.scheduler.play_manual(AlertLevel::Critical).await;
                    debug!("Drowsiness cue: {:?}", outcome);
                }
                DmsAlert::DrowsinessTone => {}
                DmsAlert::DrowsinessNotice => warn!("Drowsiness detected, eyes closed"),
                DmsAlert::Yawn => debug!("Yawn detected"),
                DmsAlert::FaceNotVisible => warn!("Driver face not visible"),
            }
        }

        self.scheduler
            .update(reading.alert_level, self.alerts_enabled)
            .await;

        self.readings += 1;
        self.peak_level = self.peak_level.max(reading.alert_level);
        reading
    }

    /// Play a level on demand, independent of the monitoring state
    pub async fn manual_alert(&self, level: AlertLevel) -> PlayOutcome {
        self.scheduler.play_manual(level).await
    }

    /// Stop alerts and discard estimator history
    pub async fn shutdown(&mut self) -> SessionSummary {
        self.scheduler.shutdown().await;
        self.estimator.reset();
        let summary = SessionSummary {
            readings: self.readings,
            peak_level: self.peak_level,
            alerts_played: self.scheduler.play_count().await,
        };
        info!(
            "Session {} ended after {} readings (peak level {})",
            self.id, summary.readings, summary.peak_level
        );
        summary
    }
}

//! Tone synthesis parameters for alert patterns

use std::time::Duration;

use crate::config::{AlertConfig, AlertPattern};

/// Near-silent gain at the start and end of every tone
pub const ENVELOPE_FLOOR: f32 = 0.001;
/// Share of a tone spent ramping up
const ATTACK_FRACTION: f32 = 0.1;
/// Silence between repeated tones, on top of the tone length
const TONE_GAP: Duration = Duration::from_millis(100);

/// Sweep steps of the continuous pattern, as frequency multipliers
const SWEEP_STEPS: [f32; 3] = [1.0, 1.25, 1.5];
const SWEEP_DURATION_FRACTION: f32 = 0.5;
const SWEEP_VOLUME_FRACTION: f32 = 0.8;
/// Index of the sweep step at which speech is queued
const SPEECH_STEP: usize = 1;

/// Attack/decay gain curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub peak: f32,
    pub attack: Duration,
    pub total: Duration,
}

impl Envelope {
    pub fn new(peak: f32, total: Duration) -> Self {
        Self {
            peak,
            attack: total.mul_f32(ATTACK_FRACTION),
            total,
        }
    }

    /// Linear ramp to `peak` over the attack, exponential decay to the floor by `total`
    pub fn gain_at(&self, t: Duration) -> f32 {
        let peak = self.peak.max(ENVELOPE_FLOOR);
        if t >= self.total {
            return ENVELOPE_FLOOR;
        }
        if t < self.attack {
            let progress = t.as_secs_f32() / self.attack.as_secs_f32();
            return ENVELOPE_FLOOR + (peak - ENVELOPE_FLOOR) * progress;
        }
        let decay = (self.total - self.attack).as_secs_f32();
        if decay <= 0.0 {
            return ENVELOPE_FLOOR;
        }
        let progress = (t - self.attack).as_secs_f32() / decay;
        peak * (ENVELOPE_FLOOR / peak).powf(progress)
    }
}

/// One tone, scheduled relative to the start of its pattern
#[derive(Debug, Clone, PartialEq)]
pub struct ToneEvent {
    pub offset: Duration,
    pub frequency_hz: f32,
    pub duration: Duration,
    pub volume: f32,
    pub envelope: Envelope,
}

impl ToneEvent {
    fn new(offset: Duration, frequency_hz: f32, duration: Duration, volume: f32) -> Self {
        Self {
            offset,
            frequency_hz,
            duration,
            volume,
            envelope: Envelope::new(volume, duration),
        }
    }
}

/// Speech queued during a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechCue {
    pub offset: Duration,
    pub phrase: String,
}

/// Everything one alert instance plays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternPlan {
    pub tones: Vec<ToneEvent>,
    pub speech: Option<SpeechCue>,
}

impl PatternPlan {
    pub fn is_empty(&self) -> bool {
        self.tones.is_empty() && self.speech.is_none()
    }
}

/// Expand a level's configuration into concrete tones
pub fn render(config: &AlertConfig, phrase: Option<&str>) -> PatternPlan {
    if config.is_silent() {
        return PatternPlan::default();
    }

    let duration = Duration::from_secs_f32(config.tone_duration_sec);
    let spacing = duration + TONE_GAP;
    let repeated = |count: u32| -> Vec<ToneEvent> {
        (0..count)
            .map(|i| ToneEvent::new(spacing * i, config.tone_frequency_hz, duration, config.volume))
            .collect()
    };

    match config.pattern {
        AlertPattern::Single => PatternPlan {
            tones: repeated(1),
            speech: None,
        },
        AlertPattern::Double => PatternPlan {
            tones: repeated(2),
            speech: None,
        },
        AlertPattern::Triple => PatternPlan {
            tones: repeated(3),
            speech: None,
        },
        AlertPattern::Continuous => {
            let step = duration.mul_f32(SWEEP_DURATION_FRACTION);
            let volume = config.volume * SWEEP_VOLUME_FRACTION;
            let tones = SWEEP_STEPS
                .iter()
                .zip(0u32..)
                .map(|(&ratio, i)| {
                    ToneEvent::new(step * i, config.tone_frequency_hz * ratio, step, volume)
                })
                .collect();
            let speech = phrase.map(|phrase| SpeechCue {
                offset: step * SPEECH_STEP as u32,
                phrase: phrase.to_string(),
            });
            PatternPlan { tones, speech }
        }
    }
}

//! Alert scheduler: immediate play on level change, then a repeat timer
//!
//! At most one repeat timer is alive. Every transition aborts the old
//! timer before arming the next one, and every path back to idle (level 0,
//! disabled, shutdown, drop) aborts it as well.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use dms::AlertLevel;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::audio::{
    select_voice, AudioSink, NullAudioSink, NullSpeech, SpeechSynth, Utterance, Voice,
    VoicePreference,
};
use crate::config::AlertProfile;
use crate::throttle::PlayThrottle;
use crate::tone::{self, SpeechCue};
use crate::AlertError;

/// Scheduler state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Scheduled(AlertLevel),
}

/// Why a play was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayOrigin {
    Transition,
    Timer,
    Manual,
}

/// Result of a play attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Played,
    /// Inside the level's repeat interval
    Throttled,
    /// Level has nothing to play
    Silent,
}

/// Queued utterance; reachable without the player lock so teardown can
/// always abort it
type SpeechSlot = Arc<StdMutex<Option<JoinHandle<()>>>>;

fn abort_pending(slot: &StdMutex<Option<JoinHandle<()>>>) {
    let pending = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(pending) = pending {
        pending.abort();
    }
}

/// Playback half of the scheduler, shared with the timer task
struct AlertPlayer {
    profile: AlertProfile,
    audio: Arc<dyn AudioSink>,
    speech: Arc<dyn SpeechSynth>,
    voice: Option<Voice>,
    voice_preference: VoicePreference,
    throttle: PlayThrottle,
    pending_speech: SpeechSlot,
    plays: u64,
}

impl AlertPlayer {
    fn interval(&self, level: AlertLevel) -> Duration {
        Duration::from_millis(self.profile.get(level).repeat_interval_ms)
    }

    fn play(&mut self, level: AlertLevel, origin: PlayOrigin) -> PlayOutcome {
        let config = self.profile.get(level);
        if config.is_silent() {
            return PlayOutcome::Silent;
        }

        let now = Instant::now();
        if !self.throttle.allows(level, self.interval(level), now) {
            return PlayOutcome::Throttled;
        }

        let plan = tone::render(&config, self.profile.phrase_for(level));
        debug!(
            "Playing level {} ({:?}, {} tones, {:?})",
            level,
            config.pattern,
            plan.tones.len(),
            origin
        );

        for tone in &plan.tones {
            if let Err(e) = self.audio.play_tone(tone) {
                debug!("Tone dropped: {}", e);
                break;
            }
        }
        if let Some(cue) = plan.speech {
            self.queue_speech(cue);
        }

        // Manual plays do not push back the natural cadence
        if origin != PlayOrigin::Manual {
            self.throttle.record(level, now);
        }
        self.plays += 1;
        PlayOutcome::Played
    }

    /// Speak `cue` after its offset, superseding any earlier utterance
    fn queue_speech(&mut self, cue: SpeechCue) {
        self.cancel_speech();

        let speech = Arc::clone(&self.speech);
        let utterance = Utterance {
            text: cue.phrase,
            voice: self.voice.clone(),
            rate: self.voice_preference.rate,
            volume: self.voice_preference.volume,
        };
        let due = Instant::now() + cue.offset;
        let pending = tokio::spawn(async move {
            time::sleep_until(due).await;
            speech.cancel();
            if let Err(e) = speech.speak(&utterance) {
                debug!("Speech dropped: {}", e);
            }
        });
        *self
            .pending_speech
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(pending);
    }

    fn cancel_speech(&mut self) {
        abort_pending(&self.pending_speech);
        self.speech.cancel();
    }
}

/// Drives repeating audio/voice alerts from the current alert level
pub struct AlertScheduler {
    player: Arc<Mutex<AlertPlayer>>,
    speech: Arc<dyn SpeechSynth>,
    pending_speech: SpeechSlot,
    state: SchedulerState,
    enabled: bool,
    timer: Option<JoinHandle<()>>,
}

impl AlertScheduler {
    /// Create a scheduler; queries `speech` once for its voices
    pub fn new(
        profile: AlertProfile,
        audio: Arc<dyn AudioSink>,
        speech: Arc<dyn SpeechSynth>,
        voice_preference: VoicePreference,
    ) -> Result<Self, AlertError> {
        profile.validate()?;

        let voices = speech.voices();
        let voice = select_voice(&voices, &voice_preference);
        match &voice {
            Some(v) => info!("Alert voice: {} ({})", v.name, v.language),
            None => info!("No speech voices available, spoken alerts disabled"),
        }

        let pending_speech = SpeechSlot::default();
        Ok(Self {
            player: Arc::new(Mutex::new(AlertPlayer {
                profile,
                audio,
                speech: Arc::clone(&speech),
                voice,
                voice_preference,
                throttle: PlayThrottle::new(),
                pending_speech: Arc::clone(&pending_speech),
                plays: 0,
            })),
            speech,
            pending_speech,
            state: SchedulerState::Idle,
            enabled: true,
            timer: None,
        })
    }

    /// Scheduler without audio or speech output
    pub fn silent(profile: AlertProfile) -> Result<Self, AlertError> {
        Self::new(
            profile,
            Arc::new(NullAudioSink),
            Arc::new(NullSpeech),
            VoicePreference::default(),
        )
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check whether a repeat timer is still armed
    pub fn has_active_timer(&self) -> bool {
        self.timer.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Number of patterns actually played, manual plays included
    pub async fn play_count(&self) -> u64 {
        self.player.lock().await.plays
    }

    /// Feed the latest alert level
    pub async fn update(&mut self, level: AlertLevel, enabled: bool) {
        self.enabled = enabled;
        let target = (enabled && level.is_alerting()).then_some(level);

        match (self.state, target) {
            (SchedulerState::Scheduled(current), Some(next)) if current == next => {}
            (_, Some(next)) => self.schedule(next).await,
            (SchedulerState::Scheduled(_), None) => self.stop().await,
            (SchedulerState::Idle, None) => {}
        }
    }

    /// Play `level` now regardless of the monitoring state
    pub async fn play_manual(&self, level: AlertLevel) -> PlayOutcome {
        info!("Manual alert requested at level {}", level);
        self.player.lock().await.play(level, PlayOrigin::Manual)
    }

    /// Cancel the timer and queued speech, return to idle
    pub async fn shutdown(&mut self) {
        self.stop().await;
        self.player.lock().await.throttle.clear();
    }

    async fn schedule(&mut self, level: AlertLevel) {
        self.cancel_timer();

        let period = {
            let mut player = self.player.lock().await;
            let outcome = player.play(level, PlayOrigin::Transition);
            debug!("Immediate play at level {}: {:?}", level, outcome);
            player.interval(level)
        };

        let first_repeat = Instant::now() + period;
        let player = Arc::clone(&self.player);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(first_repeat, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                player.lock().await.play(level, PlayOrigin::Timer);
            }
        }));

        info!(
            "Alert scheduled at level {} every {}ms",
            level,
            period.as_millis()
        );
        self.state = SchedulerState::Scheduled(level);
    }

    async fn stop(&mut self) {
        self.cancel_timer();
        self.player.lock().await.cancel_speech();
        if self.state != SchedulerState::Idle {
            info!("Alert scheduler idle");
        }
        self.state = SchedulerState::Idle;
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for AlertScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
        abort_pending(&self.pending_speech);
        self.speech.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::ToneEvent;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        tones: StdMutex<Vec<(Instant, ToneEvent)>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.tones.lock().unwrap().len()
        }
    }

    impl AudioSink for RecordingSink {
        fn play_tone(&self, tone: &ToneEvent) -> Result<(), AlertError> {
            self.tones.lock().unwrap().push((Instant::now(), tone.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSpeech {
        spoken: StdMutex<Vec<Utterance>>,
        cancels: StdMutex<usize>,
    }

    impl SpeechSynth for RecordingSpeech {
        fn voices(&self) -> Vec<Voice> {
            vec![Voice {
                name: "Samantha".into(),
                language: "en-US".into(),
                is_default: true,
            }]
        }

        fn speak(&self, utterance: &Utterance) -> Result<(), AlertError> {
            self.spoken.lock().unwrap().push(utterance.clone());
            Ok(())
        }

        fn cancel(&self) {
            *self.cancels.lock().unwrap() += 1;
        }
    }

    fn scheduler() -> (AlertScheduler, Arc<RecordingSink>, Arc<RecordingSpeech>) {
        let sink = Arc::new(RecordingSink::default());
        let speech = Arc::new(RecordingSpeech::default());
        let scheduler = AlertScheduler::new(
            AlertProfile::default(),
            sink.clone(),
            speech.clone(),
            VoicePreference::default(),
        )
        .unwrap();
        (scheduler, sink, speech)
    }

    async fn advance(ms: u64) {
        time::advance(Duration::from_millis(ms)).await;
        // let woken tasks run
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn nonzero_level_plays_immediately_and_repeats() {
        let (mut scheduler, sink, _) = scheduler();

        scheduler.update(AlertLevel::Minor, true).await;
        assert_eq!(scheduler.state(), SchedulerState::Scheduled(AlertLevel::Minor));
        assert_eq!(sink.count(), 1);

        advance(9_999).await;
        assert_eq!(sink.count(), 1);
        advance(1).await;
        assert_eq!(sink.count(), 2);
        advance(10_000).await;
        assert_eq!(sink.count(), 3);
        assert_eq!(scheduler.play_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn same_level_does_not_replay() {
        let (mut scheduler, sink, _) = scheduler();
        scheduler.update(AlertLevel::Minor, true).await;
        scheduler.update(AlertLevel::Minor, true).await;
        scheduler.update(AlertLevel::Minor, true).await;
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn round_trip_to_normal_leaves_no_timer() {
        let (mut scheduler, sink, _) = scheduler();

        scheduler.update(AlertLevel::Moderate, true).await;
        advance(200).await;
        scheduler.update(AlertLevel::Normal, true).await;

        // double pattern: one immediate play, two tones
        assert_eq!(scheduler.play_count().await, 1);
        assert_eq!(sink.count(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.has_active_timer());

        advance(60_000).await;
        assert_eq!(scheduler.play_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn escalation_plays_now_once_interval_has_passed() {
        let (mut scheduler, _, _) = scheduler();

        scheduler.update(AlertLevel::Minor, true).await;
        advance(7_000).await;
        scheduler.update(AlertLevel::Moderate, true).await;
        assert_eq!(scheduler.play_count().await, 2);
        assert_eq!(scheduler.state(), SchedulerState::Scheduled(AlertLevel::Moderate));

        // only the moderate cadence (6s) is live, the minor one (10s at t=10s) is gone
        advance(3_000).await;
        assert_eq!(scheduler.play_count().await, 2);
        advance(3_000).await;
        assert_eq!(scheduler.play_count().await, 3);
        advance(6_000).await;
        assert_eq!(scheduler.play_count().await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_escalation_waits_for_new_cadence() {
        let (mut scheduler, _, _) = scheduler();

        scheduler.update(AlertLevel::Minor, true).await;
        advance(100).await;
        scheduler.update(AlertLevel::Moderate, true).await;

        // 100ms after the minor play: suppressed, but the moderate timer is armed
        assert_eq!(scheduler.play_count().await, 1);
        assert_eq!(scheduler.state(), SchedulerState::Scheduled(AlertLevel::Moderate));
        assert!(scheduler.has_active_timer());

        advance(5_999).await;
        assert_eq!(scheduler.play_count().await, 1);
        advance(1).await;
        assert_eq!(scheduler.play_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn level_change_right_after_timer_fire_is_suppressed() {
        let (mut scheduler, _, _) = scheduler();

        scheduler.update(AlertLevel::Minor, true).await;
        advance(10_000).await;
        assert_eq!(scheduler.play_count().await, 2);

        advance(10).await;
        scheduler.update(AlertLevel::Moderate, true).await;
        assert_eq!(scheduler.play_count().await, 2);

        // moderate timer armed at 10.01s fires at 16.01s, 6.01s after the last play
        advance(6_000).await;
        assert_eq!(scheduler.play_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_return_to_same_level_is_throttled() {
        let (mut scheduler, _, _) = scheduler();

        scheduler.update(AlertLevel::Moderate, true).await;
        scheduler.update(AlertLevel::Normal, true).await;
        advance(300).await;
        scheduler.update(AlertLevel::Moderate, true).await;

        assert_eq!(scheduler.play_count().await, 1);
        assert!(scheduler.has_active_timer());
        // timer was re-armed at 300ms
        advance(5_700).await;
        assert_eq!(scheduler.play_count().await, 1);
        advance(300).await;
        assert_eq!(scheduler.play_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_stops_alerts() {
        let (mut scheduler, sink, _) = scheduler();

        scheduler.update(AlertLevel::Critical, true).await;
        let played = sink.count();
        scheduler.update(AlertLevel::Critical, false).await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.is_enabled());

        advance(30_000).await;
        assert_eq!(sink.count(), played);

        // disabled from the start: nothing plays
        scheduler.update(AlertLevel::Moderate, false).await;
        assert_eq!(sink.count(), played);
    }

    #[tokio::test(start_paused = true)]
    async fn critical_sweep_speaks_mid_pattern() {
        let (mut scheduler, sink, speech) = scheduler();

        scheduler.update(AlertLevel::Critical, true).await;
        assert_eq!(sink.count(), 3);
        assert!(speech.spoken.lock().unwrap().is_empty());

        advance(200).await;
        let spoken = speech.spoken.lock().unwrap().clone();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].voice.as_ref().unwrap().name, "Samantha");
        assert!(spoken[0].text.contains("fatigue"));
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_cancels_queued_speech() {
        let (mut scheduler, _, speech) = scheduler();

        scheduler.update(AlertLevel::Critical, true).await;
        scheduler.update(AlertLevel::Normal, true).await;
        advance(1_000).await;

        assert!(speech.spoken.lock().unwrap().is_empty());
        assert!(*speech.cancels.lock().unwrap() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_play_respects_natural_throttle_only() {
        let (mut scheduler, _, _) = scheduler();

        // idle scheduler: manual plays go straight through
        assert_eq!(scheduler.play_manual(AlertLevel::Moderate).await, PlayOutcome::Played);
        assert_eq!(scheduler.play_manual(AlertLevel::Moderate).await, PlayOutcome::Played);
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.update(AlertLevel::Moderate, true).await;
        assert_eq!(scheduler.play_count().await, 3);
        assert_eq!(scheduler.play_manual(AlertLevel::Moderate).await, PlayOutcome::Throttled);
        assert_eq!(scheduler.play_manual(AlertLevel::Critical).await, PlayOutcome::Throttled);
        assert_eq!(scheduler.play_manual(AlertLevel::Normal).await, PlayOutcome::Silent);

        // critical repeats every 3s, moderate every 6s, both measured from the last natural play
        advance(3_000).await;
        assert_eq!(scheduler.play_manual(AlertLevel::Moderate).await, PlayOutcome::Throttled);
        assert_eq!(scheduler.play_manual(AlertLevel::Critical).await, PlayOutcome::Played);
        // manual plays do not move the natural cadence
        assert_eq!(scheduler.play_manual(AlertLevel::Critical).await, PlayOutcome::Played);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_speech_while_player_is_busy() {
        let (mut scheduler, _, speech) = scheduler();
        scheduler.update(AlertLevel::Critical, true).await;

        // the repeat task may hold the player lock at teardown
        let player = Arc::clone(&scheduler.player);
        let guard = player.lock().await;
        drop(scheduler);
        advance(1_000).await;
        drop(guard);
        advance(10).await;

        assert!(speech.spoken.lock().unwrap().is_empty());
        assert!(*speech.cancels.lock().unwrap() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_audio_is_tolerated() {
        let mut scheduler = AlertScheduler::silent(AlertProfile::default()).unwrap();

        scheduler.update(AlertLevel::Critical, true).await;
        advance(3_000).await;
        assert_eq!(scheduler.play_count().await, 2);
        scheduler.shutdown().await;
        assert!(!scheduler.has_active_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_to_idle() {
        let (mut scheduler, sink, _) = scheduler();
        scheduler.update(AlertLevel::Minor, true).await;
        scheduler.shutdown().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        advance(20_000).await;
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn invalid_profile_is_rejected() {
        let mut profile = AlertProfile::default();
        profile.moderate.repeat_interval_ms = 0;
        assert!(matches!(
            AlertScheduler::silent(profile),
            Err(AlertError::InvalidProfile(_))
        ));
    }
}

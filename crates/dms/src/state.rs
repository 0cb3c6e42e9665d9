//! Driver state tracking

/// Per-session counters, owned by one estimator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FatigueState {
    /// Frames classified as eyes closed
    pub closed_eye_frames: u64,

    /// Frames with a tracked face
    pub total_frames: u64,

    /// Consecutive frames below the closed-eye EAR threshold
    pub ear_below_streak: u32,

    /// Consecutive frames above the yawn MAR threshold
    pub mar_above_streak: u32,

    /// Length of the current sub-blink-threshold run
    pub blink_run_length: u32,

    /// Completed blinks this session
    pub total_blinks: u64,

    /// Completed yawns this session
    pub yawn_count: u32,

    /// Frame timestamp of the last drowsiness cue (milliseconds)
    pub last_alert_tone_ms: Option<u64>,

    /// Drowsiness notice already raised for the current closed-eye episode
    pub drowsiness_notified: bool,
}

impl FatigueState {
    /// Calculate PERCLOS (Percentage of Eye Closure), 0-100
    pub fn perclos(&self) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.closed_eye_frames as f32 / self.total_frames as f32 * 100.0
    }

    /// Blinks per minute, extrapolated from frames seen at `frame_rate_hz`
    pub fn blink_rate(&self, frame_rate_hz: f32) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.total_blinks as f32 / self.total_frames as f32 * (frame_rate_hz * 60.0)
    }

    /// Reset state (new session)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

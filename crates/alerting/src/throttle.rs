//! Play throttling against the last natural play

use std::time::Duration;

use dms::AlertLevel;
use tokio::time::Instant;
use tracing::debug;

/// The most recent natural play, whatever its level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlayRecord {
    level: AlertLevel,
    at: Instant,
}

/// Suppresses any play that comes sooner than the requested level's
/// repeat interval after the last natural play
#[derive(Debug, Default)]
pub struct PlayThrottle {
    last: Option<PlayRecord>,
}

impl PlayThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `level` may play at `now` given its repeat interval
    pub fn allows(&self, level: AlertLevel, interval: Duration, now: Instant) -> bool {
        let Some(last) = self.last else {
            return true;
        };

        let elapsed = now.saturating_duration_since(last.at);
        if elapsed < interval {
            debug!(
                "Level {} suppressed: {}ms since level {} played, interval {}ms",
                level,
                elapsed.as_millis(),
                last.level,
                interval.as_millis()
            );
            return false;
        }
        true
    }

    /// Record that `level` played at `now`
    pub fn record(&mut self, level: AlertLevel, now: Instant) {
        self.last = Some(PlayRecord { level, at: now });
    }

    /// Forget the last play
    pub fn clear(&mut self) {
        self.last = None;
    }
}

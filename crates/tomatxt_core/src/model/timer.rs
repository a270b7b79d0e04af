//! Timer session record.
//!
//! # Invariants
//! - `0 <= remaining <= duration(phase)`.
//! - Durations are strictly positive and stored in seconds.

use serde::{Deserialize, Serialize};

/// Default work phase length used before any explicit `init`.
pub const DEFAULT_WORK_MINUTES: u32 = 25;
/// Default break phase length used before any explicit `init`.
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// One of the two alternating timer modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "work" => Some(Self::Work),
            "break" => Some(Self::Break),
            _ => None,
        }
    }
}

/// Snapshot of the single global timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub phase: Phase,
    /// Work phase length in seconds.
    pub work_duration: u32,
    /// Break phase length in seconds.
    pub break_duration: u32,
    /// Seconds left in the current phase.
    pub remaining: u32,
    pub is_paused: bool,
}

impl TimerSession {
    /// Configured length of the current phase in seconds.
    pub fn phase_duration(&self) -> u32 {
        match self.phase {
            Phase::Work => self.work_duration,
            Phase::Break => self.break_duration,
        }
    }

    /// Whether the current phase has run out.
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Renders `remaining` as `MM:SS`; minutes are not capped at 59.
    pub fn format_remaining(&self) -> String {
        format_seconds(self.remaining)
    }
}

impl Default for TimerSession {
    fn default() -> Self {
        let work_duration = minutes_to_seconds(DEFAULT_WORK_MINUTES);
        Self {
            phase: Phase::Work,
            work_duration,
            break_duration: minutes_to_seconds(DEFAULT_BREAK_MINUTES),
            remaining: work_duration,
            is_paused: true,
        }
    }
}

/// Converts whole minutes to seconds, saturating on overflow.
pub fn minutes_to_seconds(minutes: u32) -> u32 {
    minutes.saturating_mul(60)
}

/// Formats a second count as zero-padded `MM:SS`.
pub fn format_seconds(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::{format_seconds, Phase, TimerSession};

    #[test]
    fn default_session_is_paused_work() {
        let session = TimerSession::default();
        assert_eq!(session.phase, Phase::Work);
        assert_eq!(session.remaining, 1500);
        assert_eq!(session.break_duration, 300);
        assert!(session.is_paused);
    }

    #[test]
    fn format_pads_minutes_and_seconds() {
        assert_eq!(format_seconds(0), "00:00");
        assert_eq!(format_seconds(65), "01:05");
        assert_eq!(format_seconds(1500), "25:00");
        assert_eq!(format_seconds(6000), "100:00");
    }

    #[test]
    fn phase_round_trips_through_storage_label() {
        for phase in [Phase::Work, Phase::Break] {
            assert_eq!(Phase::parse(phase.as_str()), Some(phase));
        }
        assert_eq!(Phase::parse("nap"), None);
    }
}

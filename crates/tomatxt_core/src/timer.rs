//! Focus timer state machine.
//!
//! # Responsibility
//! - Own the single global `TimerSession` and every phase transition.
//! - Count down only when the caller steps it via `tick`.
//!
//! # Invariants
//! - `0 <= remaining <= duration(phase)` after every operation.
//! - `remaining == 0` never advances the phase on its own; the caller must
//!   call `start_break`, `start_work` or `reset`.
//! - The engine holds no clock, thread or scheduled task.

use crate::model::timer::{minutes_to_seconds, Phase, TimerSession};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TimerResult<T> = Result<T, TimerError>;

/// Rejected timer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Duration input was zero minutes.
    InvalidConfig { field: &'static str, minutes: i64 },
    /// Requested phase change is not allowed from the current phase.
    InvalidTransition { from: Phase, to: Phase },
    /// Resume requested with nothing left to count down.
    AlreadyExpired(Phase),
}

impl Display for TimerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig { field, minutes } => {
                write!(f, "{field} must be a positive number of minutes, got {minutes}")
            }
            Self::InvalidTransition { from, to } => write!(
                f,
                "cannot start {} phase while in {} phase",
                to.as_str(),
                from.as_str()
            ),
            Self::AlreadyExpired(phase) => write!(
                f,
                "{} phase has expired; start the next phase or reset first",
                phase.as_str()
            ),
        }
    }
}

impl Error for TimerError {}

/// Caller-driven countdown over one `TimerSession`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerEngine {
    session: TimerSession,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores an engine from a persisted session.
    ///
    /// `remaining` is clamped to the current phase duration so a hand-edited
    /// row cannot break the countdown bounds.
    pub fn from_session(mut session: TimerSession) -> Self {
        session.remaining = session.remaining.min(session.phase_duration());
        Self { session }
    }

    /// Replaces the session with a fresh, paused work phase.
    pub fn init(&mut self, work_minutes: i64, break_minutes: i64) -> TimerResult<TimerSession> {
        let work_duration = positive_minutes("work_minutes", work_minutes)?;
        let break_duration = positive_minutes("break_minutes", break_minutes)?;
        self.session = TimerSession {
            phase: Phase::Work,
            work_duration,
            break_duration,
            remaining: work_duration,
            is_paused: true,
        };
        Ok(self.session)
    }

    /// Pauses the countdown; pausing twice is a no-op.
    pub fn pause(&mut self) {
        self.session.is_paused = true;
    }

    pub fn resume(&mut self) -> TimerResult<()> {
        if self.session.is_expired() {
            return Err(TimerError::AlreadyExpired(self.session.phase));
        }
        self.session.is_paused = false;
        Ok(())
    }

    /// Counts down one second and returns the remaining time as `MM:SS`.
    ///
    /// Paused or expired sessions are left untouched.
    pub fn tick(&mut self) -> String {
        if !self.session.is_paused && self.session.remaining > 0 {
            self.session.remaining -= 1;
        }
        self.session.format_remaining()
    }

    pub fn start_break(&mut self) -> TimerResult<TimerSession> {
        self.enter_phase(Phase::Break)
    }

    pub fn start_work(&mut self) -> TimerResult<TimerSession> {
        self.enter_phase(Phase::Work)
    }

    /// Returns to a paused work phase from anywhere.
    pub fn reset(&mut self) -> TimerSession {
        self.session.phase = Phase::Work;
        self.session.remaining = self.session.work_duration;
        self.session.is_paused = true;
        self.session
    }

    /// Reconfigures the work length. During a work phase `remaining` restarts
    /// at the new length; a break is left alone.
    pub fn update_work_duration(&mut self, minutes: i64) -> TimerResult<TimerSession> {
        let seconds = positive_minutes("work_minutes", minutes)?;
        self.session.work_duration = seconds;
        if self.session.phase == Phase::Work {
            self.session.remaining = seconds;
        }
        Ok(self.session)
    }

    /// Reconfigures the break length. Mirrors `update_work_duration`.
    pub fn update_break_duration(&mut self, minutes: i64) -> TimerResult<TimerSession> {
        let seconds = positive_minutes("break_minutes", minutes)?;
        self.session.break_duration = seconds;
        if self.session.phase == Phase::Break {
            self.session.remaining = seconds;
        }
        Ok(self.session)
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_expired()
    }

    pub fn snapshot(&self) -> TimerSession {
        self.session
    }

    fn enter_phase(&mut self, target: Phase) -> TimerResult<TimerSession> {
        if self.session.phase == target {
            return Err(TimerError::InvalidTransition {
                from: self.session.phase,
                to: target,
            });
        }
        self.session.phase = target;
        self.session.remaining = self.session.phase_duration();
        self.session.is_paused = false;
        Ok(self.session)
    }
}

fn positive_minutes(field: &'static str, minutes: i64) -> TimerResult<u32> {
    match u32::try_from(minutes) {
        Ok(value) if value > 0 => Ok(minutes_to_seconds(value)),
        _ => Err(TimerError::InvalidConfig { field, minutes }),
    }
}

#[cfg(test)]
mod tests {
    use super::{TimerEngine, TimerError};
    use crate::model::timer::Phase;

    fn running(work: i64, brk: i64) -> TimerEngine {
        let mut engine = TimerEngine::new();
        engine.init(work, brk).unwrap();
        engine.resume().unwrap();
        engine
    }

    #[test]
    fn init_rejects_non_positive_minutes() {
        let mut engine = TimerEngine::new();
        assert!(matches!(
            engine.init(0, 5),
            Err(TimerError::InvalidConfig {
                field: "work_minutes",
                ..
            })
        ));
        assert!(matches!(
            engine.init(25, -1),
            Err(TimerError::InvalidConfig {
                field: "break_minutes",
                ..
            })
        ));
        assert_eq!(engine.snapshot().remaining, 1500);
    }

    #[test]
    fn tick_does_nothing_while_paused() {
        let mut engine = TimerEngine::new();
        engine.init(1, 1).unwrap();
        assert_eq!(engine.tick(), "01:00");
        assert_eq!(engine.snapshot().remaining, 60);
    }

    #[test]
    fn pause_is_idempotent() {
        let mut engine = running(1, 1);
        engine.pause();
        engine.pause();
        assert!(engine.snapshot().is_paused);
    }

    #[test]
    fn tick_counts_down_to_zero_and_stops() {
        let mut engine = running(1, 1);
        for _ in 0..59 {
            engine.tick();
        }
        assert_eq!(engine.tick(), "00:00");
        assert!(engine.is_finished());
        assert_eq!(engine.tick(), "00:00");
        assert_eq!(engine.snapshot().phase, Phase::Work);
        assert_eq!(engine.resume(), Err(TimerError::AlreadyExpired(Phase::Work)));
    }

    #[test]
    fn start_work_is_only_valid_from_break() {
        let mut engine = running(2, 1);
        assert!(matches!(
            engine.start_work(),
            Err(TimerError::InvalidTransition { .. })
        ));
        engine.start_break().unwrap();
        engine.tick();
        let session = engine.start_work().unwrap();
        assert_eq!(session.phase, Phase::Work);
        assert_eq!(session.remaining, 120);
        assert!(!session.is_paused);
    }

    #[test]
    fn reconfiguring_current_phase_restarts_it() {
        let mut engine = running(25, 5);
        engine.tick();
        let session = engine.update_work_duration(10).unwrap();
        assert_eq!(session.remaining, 600);

        let session = engine.update_break_duration(3).unwrap();
        assert_eq!(session.break_duration, 180);
        assert_eq!(session.remaining, 600);

        assert!(engine.update_break_duration(0).is_err());
        assert_eq!(engine.snapshot().break_duration, 180);
    }

    #[test]
    fn from_session_clamps_remaining() {
        let mut session = TimerEngine::new().snapshot();
        session.remaining = session.work_duration + 10;
        let engine = TimerEngine::from_session(session);
        assert_eq!(engine.snapshot().remaining, session.work_duration);
    }
}

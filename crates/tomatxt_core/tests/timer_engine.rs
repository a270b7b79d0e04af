use tomatxt_core::{Phase, TimerEngine, TimerError, TimerSession};

#[test]
fn init_configures_a_paused_work_phase() {
    let mut engine = TimerEngine::new();
    let session = engine.init(25, 5).unwrap();

    assert_eq!(
        session,
        TimerSession {
            phase: Phase::Work,
            work_duration: 1500,
            break_duration: 300,
            remaining: 1500,
            is_paused: true,
        }
    );
    assert_eq!(session.format_remaining(), "25:00");
}

#[test]
fn tick_on_last_second_reaches_zero_and_stays() {
    let mut engine = TimerEngine::from_session(TimerSession {
        phase: Phase::Work,
        work_duration: 60,
        break_duration: 60,
        remaining: 1,
        is_paused: false,
    });

    assert_eq!(engine.tick(), "00:00");
    assert!(engine.is_finished());
    assert_eq!(engine.tick(), "00:00");
    assert_eq!(engine.snapshot().remaining, 0);
    assert_eq!(engine.snapshot().phase, Phase::Work);
}

#[test]
fn starting_break_twice_is_rejected() {
    let mut engine = TimerEngine::new();
    let session = engine.start_break().unwrap();
    assert_eq!(session.phase, Phase::Break);
    assert_eq!(session.remaining, 300);
    assert!(!session.is_paused);

    assert_eq!(
        engine.start_break(),
        Err(TimerError::InvalidTransition {
            from: Phase::Break,
            to: Phase::Break,
        })
    );
    assert_eq!(engine.snapshot(), session);
}

#[test]
fn reset_returns_to_paused_full_work_phase() {
    let mut engine = TimerEngine::new();
    engine.init(10, 2).unwrap();
    engine.start_break().unwrap();
    engine.tick();

    let session = engine.reset();
    assert_eq!(session.phase, Phase::Work);
    assert_eq!(session.remaining, 600);
    assert!(session.is_paused);
}

#[test]
fn resume_after_expiry_is_rejected_until_next_phase() {
    let mut engine = TimerEngine::from_session(TimerSession {
        phase: Phase::Break,
        work_duration: 120,
        break_duration: 60,
        remaining: 0,
        is_paused: true,
    });

    assert_eq!(engine.resume(), Err(TimerError::AlreadyExpired(Phase::Break)));
    let session = engine.start_work().unwrap();
    assert_eq!(session.remaining, 120);
    engine.pause();
    assert!(engine.resume().is_ok());
}

#[test]
fn remaining_stays_within_phase_bounds() {
    let mut engine = TimerEngine::new();
    engine.init(1, 1).unwrap();
    engine.resume().unwrap();

    for step in 0..200 {
        match step % 50 {
            10 => {
                let _ = engine.start_break();
            }
            30 => {
                let _ = engine.start_work();
            }
            45 => {
                engine.update_work_duration(2).unwrap();
            }
            _ => {
                engine.tick();
            }
        }
        let session = engine.snapshot();
        assert!(session.remaining <= session.phase_duration());
    }
}

#[test]
fn duration_updates_reject_non_positive_minutes() {
    let mut engine = TimerEngine::new();
    assert!(matches!(
        engine.update_work_duration(0),
        Err(TimerError::InvalidConfig { minutes: 0, .. })
    ));
    assert!(matches!(
        engine.update_break_duration(-3),
        Err(TimerError::InvalidConfig { minutes: -3, .. })
    ));
    assert_eq!(engine.snapshot(), TimerSession::default());
}

//! Core domain logic for tomatxt: a note store whose checklist children are
//! derived from note content, and a caller-driven focus timer.
//! This crate is the single source of truth for their invariants.

pub mod api;
pub mod checklist;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod timer;

pub use api::{CommandApi, CommandError, CommandResult};
pub use checklist::{ChecklistItem, ChecklistProgress, ReconcileOutcome};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteId};
pub use model::timer::{Phase, TimerSession, DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES};
pub use repo::note_repo::{NoteRecord, NoteRepository, SqliteNoteRepository};
pub use repo::timer_repo::{SqliteTimerRepository, TimerRepository};
pub use repo::{RepoError, RepoResult};
pub use service::note_service::{NoteService, NoteServiceError};
pub use timer::{TimerEngine, TimerError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

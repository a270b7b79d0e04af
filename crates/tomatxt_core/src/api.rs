//! Command surface consumed by the presentation client.
//!
//! # Responsibility
//! - Expose one method per client command, composing the note service and
//!   the timer engine.
//! - Serialize access: each store sits behind its own lock, so one command at
//!   a time runs against it and its effects are complete before the next.
//! - Map internal errors onto the small, recoverable `CommandError` set.
//!
//! # Invariants
//! - Timer mutations are persisted before the in-memory engine is replaced;
//!   a failed write leaves the engine untouched.
//! - Lock order is timer before connection.

use crate::checklist::{self, ChecklistItem, ChecklistProgress};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::note::{Note, NoteId};
use crate::model::timer::TimerSession;
use crate::repo::note_repo::SqliteNoteRepository;
use crate::repo::timer_repo::{SqliteTimerRepository, TimerRepository};
use crate::repo::RepoError;
use crate::service::note_service::{NoteService, NoteServiceError, NoteServiceResult};
use crate::timer::{TimerEngine, TimerError, TimerResult};
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type CommandResult<T> = Result<T, CommandError>;

/// Recoverable command failures reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown note id, or checkbox text no longer present.
    NotFound(String),
    /// Non-positive timer durations.
    InvalidConfig(String),
    /// Phase change not allowed from the current phase.
    InvalidTransition(String),
    /// Resume requested with zero remaining.
    AlreadyExpired(String),
    /// Input rejected before reaching storage.
    InvalidInput(String),
    /// Persistence or lock failure.
    Storage(String),
}

impl CommandError {
    /// Stable machine-readable code for boundary envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::AlreadyExpired(_) => "already_expired",
            Self::InvalidInput(_) => "invalid_input",
            Self::Storage(_) => "storage",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(message)
            | Self::InvalidConfig(message)
            | Self::InvalidTransition(message)
            | Self::AlreadyExpired(message)
            | Self::InvalidInput(message)
            | Self::Storage(message) => message.as_str(),
        }
    }
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl Error for CommandError {}

impl From<NoteServiceError> for CommandError {
    fn from(value: NoteServiceError) -> Self {
        match value {
            NoteServiceError::NoteNotFound(_) | NoteServiceError::ChecklistItemNotFound { .. } => {
                Self::NotFound(value.to_string())
            }
            NoteServiceError::InvalidTitle(_) => Self::InvalidInput(value.to_string()),
            NoteServiceError::Repo(_) | NoteServiceError::InconsistentState(_) => {
                Self::Storage(value.to_string())
            }
        }
    }
}

impl From<TimerError> for CommandError {
    fn from(value: TimerError) -> Self {
        match value {
            TimerError::InvalidConfig { .. } => Self::InvalidConfig(value.to_string()),
            TimerError::InvalidTransition { .. } => Self::InvalidTransition(value.to_string()),
            TimerError::AlreadyExpired(_) => Self::AlreadyExpired(value.to_string()),
        }
    }
}

impl From<RepoError> for CommandError {
    fn from(value: RepoError) -> Self {
        NoteServiceError::from(value).into()
    }
}

impl From<DbError> for CommandError {
    fn from(value: DbError) -> Self {
        Self::Storage(value.to_string())
    }
}

/// Serialized command channel over one database and one timer.
pub struct CommandApi {
    timer: Mutex<TimerEngine>,
    conn: Mutex<Connection>,
}

impl CommandApi {
    /// Opens the database at `path` and restores the persisted timer.
    pub fn open(path: impl AsRef<Path>) -> CommandResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    pub fn open_in_memory() -> CommandResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Wraps a migrated connection. A missing timer row yields the default
    /// paused 25/5 session.
    pub fn from_connection(conn: Connection) -> CommandResult<Self> {
        let session = SqliteTimerRepository::try_new(&conn)?.load_session()?;
        let engine = match session {
            Some(session) => TimerEngine::from_session(session),
            None => TimerEngine::new(),
        };
        info!(
            "event=command_api_open module=api status=ok timer_restored={}",
            session.is_some()
        );
        Ok(Self {
            timer: Mutex::new(engine),
            conn: Mutex::new(conn),
        })
    }

    pub fn create_note(&self, title: &str, content: &str) -> CommandResult<Note> {
        self.with_notes("create_note", |service| service.create(title, content))
    }

    /// Top-level notes with `child_count`.
    pub fn get_notes(&self) -> CommandResult<Vec<Note>> {
        self.with_notes("get_notes", |service| service.list_top_level())
    }

    pub fn get_note(&self, id: NoteId) -> CommandResult<Note> {
        self.with_notes("get_note", |service| service.get(id))
    }

    pub fn update_note(&self, id: NoteId, title: &str, content: &str) -> CommandResult<Note> {
        self.with_notes("update_note", |service| service.update(id, title, content))
    }

    pub fn delete_note(&self, id: NoteId) -> CommandResult<()> {
        self.with_notes("delete_note", |service| service.delete(id))
    }

    pub fn get_child_notes(&self, parent_id: NoteId) -> CommandResult<Vec<Note>> {
        self.with_notes("get_child_notes", |service| service.list_children(parent_id))
    }

    pub fn update_note_status(&self, id: NoteId, is_done: bool) -> CommandResult<()> {
        self.with_notes("update_note_status", |service| {
            service.set_done(id, is_done).map(|_| ())
        })
    }

    /// Pure parse; touches no store.
    pub fn parse_checkboxes(&self, content: &str) -> Vec<ChecklistItem> {
        checklist::parse_checklist(content)
    }

    pub fn update_note_checkbox_status(
        &self,
        note_id: NoteId,
        checkbox_text: &str,
        new_status: bool,
    ) -> CommandResult<Note> {
        self.with_notes("update_note_checkbox_status", |service| {
            service.set_checkbox_status(note_id, checkbox_text, new_status)
        })
    }

    pub fn get_checklist_progress(&self, note_id: NoteId) -> CommandResult<ChecklistProgress> {
        self.with_notes("get_checklist_progress", |service| {
            service.checklist_progress(note_id)
        })
    }

    pub fn get_timer_state(&self) -> CommandResult<TimerSession> {
        Ok(self.lock_timer()?.snapshot())
    }

    pub fn init_timer(&self, work_min: i64, break_min: i64) -> CommandResult<TimerSession> {
        self.with_timer("init_timer", |engine| engine.init(work_min, break_min))
    }

    pub fn pause_timer(&self) -> CommandResult<()> {
        self.with_timer("pause_timer", |engine| {
            engine.pause();
            Ok(())
        })
    }

    pub fn resume_timer(&self) -> CommandResult<()> {
        self.with_timer("resume_timer", TimerEngine::resume)
    }

    /// Steps the countdown by one second; returns `MM:SS`.
    pub fn tick_timer(&self) -> CommandResult<String> {
        self.with_timer("tick_timer", |engine| Ok(engine.tick()))
    }

    pub fn start_break(&self) -> CommandResult<TimerSession> {
        self.with_timer("start_break", TimerEngine::start_break)
    }

    pub fn start_work(&self) -> CommandResult<TimerSession> {
        self.with_timer("start_work", TimerEngine::start_work)
    }

    pub fn reset_timer(&self) -> CommandResult<TimerSession> {
        self.with_timer("reset_timer", |engine| Ok(engine.reset()))
    }

    pub fn update_work_duration(&self, minutes: i64) -> CommandResult<TimerSession> {
        self.with_timer("update_work_duration", |engine| {
            engine.update_work_duration(minutes)
        })
    }

    pub fn update_break_duration(&self, minutes: i64) -> CommandResult<TimerSession> {
        self.with_timer("update_break_duration", |engine| {
            engine.update_break_duration(minutes)
        })
    }

    pub fn is_timer_finished(&self) -> CommandResult<bool> {
        Ok(self.lock_timer()?.is_finished())
    }

    fn with_notes<T>(
        &self,
        command: &'static str,
        run: impl FnOnce(&NoteService<SqliteNoteRepository<'_>>) -> NoteServiceResult<T>,
    ) -> CommandResult<T> {
        let conn = self.lock_conn()?;
        let result = SqliteNoteRepository::try_new(&conn)
            .map_err(CommandError::from)
            .and_then(|repo| run(&NoteService::new(repo)).map_err(CommandError::from));
        report(command, result)
    }

    /// Runs `step` on a copy of the engine, persists the copy, then swaps it
    /// in.
    fn with_timer<T>(
        &self,
        command: &'static str,
        step: impl FnOnce(&mut TimerEngine) -> TimerResult<T>,
    ) -> CommandResult<T> {
        let mut engine = self.lock_timer()?;
        let mut next = engine.clone();
        let result = step(&mut next).map_err(CommandError::from).and_then(|value| {
            let conn = self.lock_conn()?;
            SqliteTimerRepository::try_new(&conn)?.save_session(&next.snapshot())?;
            Ok(value)
        });
        if result.is_ok() {
            *engine = next;
        }
        report(command, result)
    }

    fn lock_conn(&self) -> CommandResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CommandError::Storage("note store lock poisoned".to_string()))
    }

    fn lock_timer(&self) -> CommandResult<MutexGuard<'_, TimerEngine>> {
        self.timer
            .lock()
            .map_err(|_| CommandError::Storage("timer lock poisoned".to_string()))
    }
}

fn report<T>(command: &'static str, result: CommandResult<T>) -> CommandResult<T> {
    if let Err(err) = &result {
        warn!(
            "event=command module=api status=error command={command} error_code={}",
            err.code()
        );
    }
    result
}

//! FFI command API for the presentation client.
//!
//! # Responsibility
//! - Expose one sync function per client command via FRB.
//! - Translate core results into flat envelopes with stable error codes.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - All commands share one process-wide `CommandApi`, so calls are
//!   serialized per store.
//! - Note ids cross the boundary as UUID strings; a malformed id is reported
//!   as `not_found`.

use log::error;
use std::path::PathBuf;
use std::sync::OnceLock;
use tomatxt_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ChecklistItem, ChecklistProgress, CommandApi, CommandError, CommandResult, Note, NoteId,
    TimerSession,
};
use uuid::Uuid;

const DB_FILE_NAME: &str = "tomatxt.sqlite3";
const DB_PATH_ENV: &str = "TOMATXT_DB_PATH";
static COMMANDS: OnceLock<CommandApi> = OnceLock::new();

/// Health-check probe.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
/// Repeating the same `level + log_dir` is fine; changing either is refused.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Note as rendered by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub content: String,
    pub content_without_checkboxes: String,
    pub content_preview: String,
    pub is_done: bool,
    pub child_count: u32,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl From<Note> for NoteItem {
    fn from(note: Note) -> Self {
        Self {
            id: note.id.to_string(),
            parent_id: note.parent_id.map(|id| id.to_string()),
            title: note.title,
            content: note.content,
            content_without_checkboxes: note.content_without_checkboxes,
            content_preview: note.content_preview,
            is_done: note.is_done,
            child_count: note.child_count,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// One parsed checkbox line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxItem {
    pub text: String,
    pub completed: bool,
}

impl From<ChecklistItem> for CheckboxItem {
    fn from(item: ChecklistItem) -> Self {
        Self {
            text: item.text,
            completed: item.completed,
        }
    }
}

/// Timer snapshot as rendered by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    /// `work` or `break`.
    pub phase: String,
    pub work_duration: u32,
    pub break_duration: u32,
    pub remaining: u32,
    /// `remaining` as `MM:SS`.
    pub remaining_formatted: String,
    pub is_paused: bool,
}

impl From<TimerSession> for TimerState {
    fn from(session: TimerSession) -> Self {
        Self {
            phase: session.phase.as_str().to_string(),
            work_duration: session.work_duration,
            break_duration: session.break_duration,
            remaining: session.remaining,
            remaining_formatted: session.format_remaining(),
            is_paused: session.is_paused,
        }
    }
}

/// Envelope for commands returning one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteResponse {
    pub ok: bool,
    pub note: Option<NoteItem>,
    pub error_code: Option<String>,
    pub message: String,
}

impl From<CommandResult<Note>> for NoteResponse {
    fn from(result: CommandResult<Note>) -> Self {
        match result {
            Ok(note) => Self {
                ok: true,
                note: Some(note.into()),
                error_code: None,
                message: String::new(),
            },
            Err(err) => Self {
                ok: false,
                note: None,
                error_code: Some(err.code().to_string()),
                message: err.to_string(),
            },
        }
    }
}

/// Envelope for commands returning a list of notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListResponse {
    pub ok: bool,
    pub items: Vec<NoteItem>,
    pub error_code: Option<String>,
    pub message: String,
}

impl From<CommandResult<Vec<Note>>> for NoteListResponse {
    fn from(result: CommandResult<Vec<Note>>) -> Self {
        match result {
            Ok(notes) => Self {
                ok: true,
                items: notes.into_iter().map(NoteItem::from).collect(),
                error_code: None,
                message: String::new(),
            },
            Err(err) => Self {
                ok: false,
                items: Vec::new(),
                error_code: Some(err.code().to_string()),
                message: err.to_string(),
            },
        }
    }
}

/// Envelope for timer commands returning a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerResponse {
    pub ok: bool,
    pub state: Option<TimerState>,
    pub error_code: Option<String>,
    pub message: String,
}

impl From<CommandResult<TimerSession>> for TimerResponse {
    fn from(result: CommandResult<TimerSession>) -> Self {
        match result {
            Ok(session) => Self {
                ok: true,
                state: Some(session.into()),
                error_code: None,
                message: String::new(),
            },
            Err(err) => Self {
                ok: false,
                state: None,
                error_code: Some(err.code().to_string()),
                message: err.to_string(),
            },
        }
    }
}

/// Envelope for `tick_timer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickResponse {
    pub ok: bool,
    /// `MM:SS`, empty on failure.
    pub remaining: String,
    pub error_code: Option<String>,
    pub message: String,
}

/// Envelope for checklist progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressResponse {
    pub ok: bool,
    pub total: u32,
    pub completed: u32,
    pub percent: f32,
    pub error_code: Option<String>,
    pub message: String,
}

/// Envelope for commands with no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub error_code: Option<String>,
    pub message: String,
}

impl From<CommandResult<()>> for ActionResponse {
    fn from(result: CommandResult<()>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error_code: None,
                message: String::new(),
            },
            Err(err) => Self {
                ok: false,
                error_code: Some(err.code().to_string()),
                message: err.to_string(),
            },
        }
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn create_note(title: String, content: String) -> NoteResponse {
    with_commands(|api| api.create_note(&title, &content)).into()
}

/// Top-level notes with child counts, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn get_notes() -> NoteListResponse {
    with_commands(CommandApi::get_notes).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn get_note(id: String) -> NoteResponse {
    with_commands(|api| api.get_note(parse_note_id(&id)?)).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_note(id: String, title: String, content: String) -> NoteResponse {
    with_commands(|api| api.update_note(parse_note_id(&id)?, &title, &content)).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_note(id: String) -> ActionResponse {
    with_commands(|api| api.delete_note(parse_note_id(&id)?)).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn get_child_notes(parent_id: String) -> NoteListResponse {
    with_commands(|api| api.get_child_notes(parse_note_id(&parent_id)?)).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_note_status(id: String, is_done: bool) -> ActionResponse {
    with_commands(|api| api.update_note_status(parse_note_id(&id)?, is_done)).into()
}

/// Pure parse of checkbox lines; never fails.
#[flutter_rust_bridge::frb(sync)]
pub fn parse_checkboxes(content: String) -> Vec<CheckboxItem> {
    tomatxt_core::checklist::parse_checklist(&content)
        .into_iter()
        .map(CheckboxItem::from)
        .collect()
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_note_checkbox_status(
    note_id: String,
    checkbox_text: String,
    new_status: bool,
) -> NoteResponse {
    with_commands(|api| {
        api.update_note_checkbox_status(parse_note_id(&note_id)?, &checkbox_text, new_status)
    })
    .into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn get_checklist_progress(note_id: String) -> ProgressResponse {
    match with_commands(|api| api.get_checklist_progress(parse_note_id(&note_id)?)) {
        Ok(ChecklistProgress {
            total,
            completed,
            percent,
        }) => ProgressResponse {
            ok: true,
            total,
            completed,
            percent,
            error_code: None,
            message: String::new(),
        },
        Err(err) => ProgressResponse {
            ok: false,
            total: 0,
            completed: 0,
            percent: 0.0,
            error_code: Some(err.code().to_string()),
            message: err.to_string(),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn get_timer_state() -> TimerResponse {
    with_commands(CommandApi::get_timer_state).into()
}

/// Configures a paused work phase; minutes must be positive.
#[flutter_rust_bridge::frb(sync)]
pub fn init_timer(work_min: i64, break_min: i64) -> TimerResponse {
    with_commands(|api| api.init_timer(work_min, break_min)).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn pause_timer() -> ActionResponse {
    with_commands(CommandApi::pause_timer).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn resume_timer() -> ActionResponse {
    with_commands(CommandApi::resume_timer).into()
}

/// Call once per elapsed second while the timer is shown.
#[flutter_rust_bridge::frb(sync)]
pub fn tick_timer() -> TickResponse {
    match with_commands(CommandApi::tick_timer) {
        Ok(remaining) => TickResponse {
            ok: true,
            remaining,
            error_code: None,
            message: String::new(),
        },
        Err(err) => TickResponse {
            ok: false,
            remaining: String::new(),
            error_code: Some(err.code().to_string()),
            message: err.to_string(),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn start_break() -> TimerResponse {
    with_commands(CommandApi::start_break).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn start_work() -> TimerResponse {
    with_commands(CommandApi::start_work).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn reset_timer() -> TimerResponse {
    with_commands(CommandApi::reset_timer).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_work_duration(minutes: i64) -> TimerResponse {
    with_commands(|api| api.update_work_duration(minutes)).into()
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_break_duration(minutes: i64) -> TimerResponse {
    with_commands(|api| api.update_break_duration(minutes)).into()
}

/// `false` also when the timer cannot be read; the failure is logged.
#[flutter_rust_bridge::frb(sync)]
pub fn is_timer_finished() -> bool {
    with_commands(CommandApi::is_timer_finished).unwrap_or(false)
}

fn parse_note_id(raw: &str) -> CommandResult<NoteId> {
    Uuid::parse_str(raw.trim()).map_err(|_| CommandError::NotFound(format!("note not found: {raw}")))
}

fn with_commands<T>(f: impl FnOnce(&CommandApi) -> CommandResult<T>) -> CommandResult<T> {
    f(commands()?)
}

fn commands() -> CommandResult<&'static CommandApi> {
    if let Some(api) = COMMANDS.get() {
        return Ok(api);
    }
    let db_path = resolve_db_path();
    let api = CommandApi::open(&db_path).map_err(|err| {
        error!(
            "event=command_api_open module=ffi status=error path={} error_code={}",
            db_path.display(),
            err.code()
        );
        err
    })?;
    // A concurrent first call may win the race; its instance is kept.
    Ok(COMMANDS.get_or_init(|| api))
}

fn resolve_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DB_FILE_NAME)
}

//! Note use-case service.
//!
//! # Responsibility
//! - Provide the NoteStore and ChecklistSync operations used by commands.
//! - Derive listing projections (`content_preview`,
//!   `content_without_checkboxes`) from raw content.
//!
//! # Invariants
//! - Every returned `Note` is read back after the write, so it reflects the
//!   reconciled state.
//! - Child titles are single-line so they survive a round trip through the
//!   parent's checkbox markup.

use crate::checklist::{self, ChecklistItem, ChecklistProgress, ReconcileOutcome};
use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::{NoteRecord, NoteRepository};
use crate::repo::RepoError;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum characters kept in `content_preview`.
pub const PREVIEW_MAX_CHARS: usize = 100;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Target note has no checkbox line with this text.
    ChecklistItemNotFound { note_id: NoteId, text: String },
    /// Child title is blank once flattened to one line.
    InvalidTitle(String),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::ChecklistItemNotFound { note_id, text } => {
                write!(f, "checkbox `{text}` not found in note {note_id}")
            }
            Self::InvalidTitle(value) => write!(f, "invalid child title: `{value}`"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            RepoError::ChecklistItemNotFound { note_id, text } => {
                Self::ChecklistItemNotFound { note_id, text }
            }
            other => Self::Repo(other),
        }
    }
}

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Note service facade over a repository implementation.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a top-level note; checkbox lines in `content` become children.
    pub fn create(&self, title: &str, content: &str) -> NoteServiceResult<Note> {
        let id = self.repo.create_note(title, content)?;
        info!("event=note_create module=service status=ok note_id={id}");
        self.read_back(id, "created note not found in read-back")
    }

    pub fn get(&self, id: NoteId) -> NoteServiceResult<Note> {
        self.repo
            .get_note(id)?
            .map(project_note)
            .ok_or(NoteServiceError::NoteNotFound(id))
    }

    /// Top-level notes in creation order, each with its `child_count`.
    pub fn list_top_level(&self) -> NoteServiceResult<Vec<Note>> {
        Ok(self
            .repo
            .list_top_level()?
            .into_iter()
            .map(project_note)
            .collect())
    }

    /// Children in checkbox-line order. Fails when the parent is unknown.
    pub fn list_children(&self, parent_id: NoteId) -> NoteServiceResult<Vec<Note>> {
        Ok(self
            .repo
            .list_children(parent_id)?
            .into_iter()
            .map(project_note)
            .collect())
    }

    /// Replaces title and content and returns the reconciled note.
    pub fn update(&self, id: NoteId, title: &str, content: &str) -> NoteServiceResult<Note> {
        let current = self.get(id)?;
        let title = if current.is_child() {
            normalize_child_title(title)
                .ok_or_else(|| NoteServiceError::InvalidTitle(title.to_string()))?
        } else {
            title.to_string()
        };

        let outcome = self.repo.update_note(id, &title, content)?;
        log_reconcile("note_update", id, outcome);
        self.read_back(id, "updated note not found in read-back")
    }

    /// Sets completion directly; a child's checkbox line follows.
    pub fn set_done(&self, id: NoteId, is_done: bool) -> NoteServiceResult<Note> {
        self.repo.set_done(id, is_done)?;
        info!("event=note_set_done module=service status=ok note_id={id} is_done={is_done}");
        self.read_back(id, "note missing after completion update")
    }

    /// Flips a checkbox line by text and returns the updated note.
    pub fn set_checkbox_status(
        &self,
        id: NoteId,
        checkbox_text: &str,
        completed: bool,
    ) -> NoteServiceResult<Note> {
        self.repo.set_checkbox_status(id, checkbox_text, completed)?;
        info!(
            "event=checkbox_set_status module=service status=ok note_id={id} completed={completed}"
        );
        self.read_back(id, "note missing after checkbox update")
    }

    /// Re-derives children from the stored content.
    pub fn reconcile(&self, parent_id: NoteId) -> NoteServiceResult<ReconcileOutcome> {
        let outcome = self.repo.reconcile_children(parent_id)?;
        log_reconcile("note_reconcile", parent_id, outcome);
        Ok(outcome)
    }

    /// Deletes a note and every materialized child.
    pub fn delete(&self, id: NoteId) -> NoteServiceResult<()> {
        self.repo.delete_note(id)?;
        info!("event=note_delete module=service status=ok note_id={id}");
        Ok(())
    }

    pub fn checklist_progress(&self, id: NoteId) -> NoteServiceResult<ChecklistProgress> {
        let note = self.get(id)?;
        let items: Vec<ChecklistItem> = checklist::parse_checklist(&note.content);
        Ok(ChecklistProgress::from_items(&items))
    }

    fn read_back(&self, id: NoteId, details: &'static str) -> NoteServiceResult<Note> {
        self.repo
            .get_note(id)?
            .map(project_note)
            .ok_or(NoteServiceError::InconsistentState(details))
    }
}

/// Builds the command-facing note from a stored record.
pub fn project_note(record: NoteRecord) -> Note {
    let content_without_checkboxes = checklist::strip_checklist(&record.content);
    let content_preview = derive_content_preview(&record.content);
    Note {
        id: record.id,
        parent_id: record.parent_id,
        title: record.title,
        content: record.content,
        is_done: record.is_done,
        position: record.position,
        created_at: record.created_at,
        updated_at: record.updated_at,
        content_without_checkboxes,
        content_preview,
        child_count: record.child_count,
    }
}

/// Derives the listing preview: checkbox lines dropped, whitespace
/// collapsed, first 100 chars kept, `...` appended when cut.
pub fn derive_content_preview(content: &str) -> String {
    let stripped = checklist::strip_checklist(content);
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();
    if trimmed.chars().count() <= PREVIEW_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut preview: String = trimmed.chars().take(PREVIEW_MAX_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Flattens a child title to one trimmed line; `None` when nothing is left.
pub fn normalize_child_title(title: &str) -> Option<String> {
    let flattened = title.replace(['\r', '\n'], " ");
    let trimmed = flattened.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn log_reconcile(event: &str, id: NoteId, outcome: ReconcileOutcome) {
    info!(
        "event={event} module=service status=ok note_id={id} created={} updated={} removed={}",
        outcome.created, outcome.updated, outcome.removed
    );
}

//! Note read model.
//!
//! # Responsibility
//! - Define the record returned by every note command.
//! - Carry derived projections (`content_preview`, `child_count`) next to the
//!   stored fields so the presentation client never recomputes them.
//!
//! # Invariants
//! - `parent_id`, when set, points at a top-level note.
//! - `is_done` on a child mirrors the checked state of its backing checkbox
//!   line in the parent content.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for notes.
pub type NoteId = Uuid;

/// Canonical note record as seen through the command surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// `None` for top-level notes.
    pub parent_id: Option<NoteId>,
    pub title: String,
    /// Raw free-form text, including checkbox lines.
    pub content: String,
    /// Meaningful only for checklist-backed children.
    pub is_done: bool,
    /// Index of the backing checkbox line among the parent's items.
    pub position: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
    /// Content with checkbox lines removed.
    pub content_without_checkboxes: String,
    /// Whitespace-collapsed, truncated listing preview.
    pub content_preview: String,
    /// Number of notes whose `parent_id` is this note.
    pub child_count: u32,
}

impl Note {
    /// Returns whether this note is a materialized checklist child.
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }
}

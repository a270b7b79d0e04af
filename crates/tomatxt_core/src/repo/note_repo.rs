//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes and their one-level parent/child links.
//! - Own checklist reconciliation: every write that changes a parent's
//!   content re-derives its children before the transaction commits.
//!
//! # Invariants
//! - Children only hang off top-level notes; checkbox lines inside a child's
//!   content are never materialized.
//! - Child order is `position ASC`, matching checkbox-line order.
//! - Top-level order is `created_at ASC` with insertion order as tiebreaker.
//! - A failed write leaves content and children exactly as before.

use crate::checklist::{self, ExistingChild, ReconcileOutcome, ReconcilePlan};
use crate::model::note::NoteId;
use crate::repo::{ensure_connection_ready, flag_to_db, parse_flag, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    n.id AS id,
    n.parent_id AS parent_id,
    n.title AS title,
    n.content AS content,
    n.is_done AS is_done,
    n.position AS position,
    n.created_at AS created_at,
    n.updated_at AS updated_at,
    (SELECT COUNT(*) FROM notes c WHERE c.parent_id = n.id) AS child_count
FROM notes n";

/// Stored note fields plus the live child count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: NoteId,
    pub parent_id: Option<NoteId>,
    pub title: String,
    pub content: String,
    pub is_done: bool,
    pub position: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    pub child_count: u32,
}

/// Repository interface for note persistence and checklist-backed children.
pub trait NoteRepository {
    /// Creates one top-level note and materializes its checklist children.
    fn create_note(&self, title: &str, content: &str) -> RepoResult<NoteId>;
    /// Gets one note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<NoteRecord>>;
    /// Lists top-level notes in creation order.
    fn list_top_level(&self) -> RepoResult<Vec<NoteRecord>>;
    /// Lists the children of an existing note in checkbox-line order.
    fn list_children(&self, parent_id: NoteId) -> RepoResult<Vec<NoteRecord>>;
    /// Replaces title and content, then reconciles children.
    ///
    /// For a child, the backing checkbox line in the parent is renamed to the
    /// new title so both sides stay aligned.
    fn update_note(&self, id: NoteId, title: &str, content: &str) -> RepoResult<ReconcileOutcome>;
    /// Sets completion on a note. For a child the parent's checkbox line is
    /// rewritten and the parent reconciled.
    fn set_done(&self, id: NoteId, is_done: bool) -> RepoResult<()>;
    /// Flips the first matching checkbox line in a note's own content.
    fn set_checkbox_status(&self, id: NoteId, text: &str, completed: bool) -> RepoResult<()>;
    /// Re-derives children from the current content without changing it.
    fn reconcile_children(&self, parent_id: NoteId) -> RepoResult<ReconcileOutcome>;
    /// Deletes a note with its children. A deleted child also loses its
    /// checkbox line in the parent.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, title: &str, content: &str) -> RepoResult<NoteId> {
        let id = Uuid::new_v4();
        let tx = self.begin()?;
        tx.execute(
            "INSERT INTO notes (id, parent_id, title, content, is_done, position)
             VALUES (?1, NULL, ?2, ?3, 0, 0);",
            params![id.to_string(), title, content],
        )?;
        reconcile_in(&tx, id, content)?;
        tx.commit()?;
        Ok(id)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<NoteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE n.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_top_level(&self) -> RepoResult<Vec<NoteRecord>> {
        query_notes(
            self.conn,
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE n.parent_id IS NULL
                 ORDER BY n.created_at ASC, n.rowid ASC;"
            ),
            None,
        )
    }

    fn list_children(&self, parent_id: NoteId) -> RepoResult<Vec<NoteRecord>> {
        if load_stored(self.conn, parent_id)?.is_none() {
            return Err(RepoError::NotFound(parent_id));
        }
        query_notes(
            self.conn,
            &format!(
                "{NOTE_SELECT_SQL}
                 WHERE n.parent_id = ?1
                 ORDER BY n.position ASC, n.rowid ASC;"
            ),
            Some(parent_id),
        )
    }

    fn update_note(&self, id: NoteId, title: &str, content: &str) -> RepoResult<ReconcileOutcome> {
        let tx = self.begin()?;
        let note = require_stored(&tx, id)?;

        let outcome = match note.parent_id {
            None => {
                write_content(&tx, id, title, content)?;
                reconcile_in(&tx, id, content)?
            }
            Some(parent_id) => {
                let parent = require_stored(&tx, parent_id)?;
                let mut parent_content = parent.content.clone();
                if note.title != title {
                    let occurrence = sibling_occurrence(&tx, &note)?;
                    parent_content =
                        checklist::rename_item_at(&parent.content, &note.title, occurrence, title)
                            .ok_or_else(|| missing_backing_line(&note))?;
                    write_content(&tx, parent_id, &parent.title, &parent_content)?;
                }
                write_content(&tx, id, title, content)?;
                reconcile_in(&tx, parent_id, &parent_content)?
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn set_done(&self, id: NoteId, is_done: bool) -> RepoResult<()> {
        let tx = self.begin()?;
        let note = require_stored(&tx, id)?;

        match note.parent_id {
            None => {
                tx.execute(
                    "UPDATE notes
                     SET is_done = ?2,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?1;",
                    params![id.to_string(), flag_to_db(is_done)],
                )?;
            }
            Some(parent_id) => {
                let parent = require_stored(&tx, parent_id)?;
                let occurrence = sibling_occurrence(&tx, &note)?;
                let parent_content =
                    checklist::set_item_status_at(&parent.content, &note.title, occurrence, is_done)
                        .ok_or_else(|| missing_backing_line(&note))?;
                write_content(&tx, parent_id, &parent.title, &parent_content)?;
                reconcile_in(&tx, parent_id, &parent_content)?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn set_checkbox_status(&self, id: NoteId, text: &str, completed: bool) -> RepoResult<()> {
        let tx = self.begin()?;
        let note = require_stored(&tx, id)?;
        let content = checklist::set_item_status(&note.content, text, completed).ok_or_else(
            || RepoError::ChecklistItemNotFound {
                note_id: id,
                text: text.to_string(),
            },
        )?;

        write_content(&tx, id, &note.title, &content)?;
        if note.parent_id.is_none() {
            reconcile_in(&tx, id, &content)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn reconcile_children(&self, parent_id: NoteId) -> RepoResult<ReconcileOutcome> {
        let tx = self.begin()?;
        let note = require_stored(&tx, parent_id)?;
        let outcome = if note.parent_id.is_none() {
            reconcile_in(&tx, parent_id, &note.content)?
        } else {
            ReconcileOutcome::default()
        };
        tx.commit()?;
        Ok(outcome)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let tx = self.begin()?;
        let note = require_stored(&tx, id)?;

        let parent = match note.parent_id {
            Some(parent_id) => {
                let parent = require_stored(&tx, parent_id)?;
                let occurrence = sibling_occurrence(&tx, &note)?;
                let content = checklist::remove_item_at(&parent.content, &note.title, occurrence)
                    .ok_or_else(|| missing_backing_line(&note))?;
                write_content(&tx, parent_id, &parent.title, &content)?;
                Some((parent_id, content))
            }
            None => None,
        };

        tx.execute(
            "DELETE FROM notes WHERE id = ?1 OR parent_id = ?1;",
            [id.to_string()],
        )?;

        if let Some((parent_id, content)) = parent {
            reconcile_in(&tx, parent_id, &content)?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Minimal stored fields needed by write paths.
#[derive(Debug)]
struct StoredNote {
    id: NoteId,
    parent_id: Option<NoteId>,
    title: String,
    content: String,
    position: i64,
}

fn load_stored(conn: &Connection, id: NoteId) -> RepoResult<Option<StoredNote>> {
    let row = conn
        .query_row(
            "SELECT parent_id, title, content, position FROM notes WHERE id = ?1;",
            [id.to_string()],
            |row| {
                Ok((
                    row.get::<_, Option<String>>("parent_id")?,
                    row.get::<_, String>("title")?,
                    row.get::<_, String>("content")?,
                    row.get::<_, i64>("position")?,
                ))
            },
        )
        .optional()?;

    row.map(|(parent_id, title, content, position)| {
        Ok(StoredNote {
            id,
            parent_id: parent_id.as_deref().map(parse_id).transpose()?,
            title,
            content,
            position,
        })
    })
    .transpose()
}

fn require_stored(conn: &Connection, id: NoteId) -> RepoResult<StoredNote> {
    load_stored(conn, id)?.ok_or(RepoError::NotFound(id))
}

fn write_content(conn: &Connection, id: NoteId, title: &str, content: &str) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE notes
         SET title = ?2,
             content = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![id.to_string(), title, content],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(())
}

fn load_children(conn: &Connection, parent_id: NoteId) -> RepoResult<Vec<ExistingChild>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, is_done, position
         FROM notes
         WHERE parent_id = ?1
         ORDER BY position ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([parent_id.to_string()])?;
    let mut children = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        children.push(ExistingChild {
            id: parse_id(&id_text)?,
            title: row.get("title")?,
            is_done: parse_flag(row.get("is_done")?, "notes.is_done")?,
            position: row.get("position")?,
        });
    }
    Ok(children)
}

/// Index of `child` among its same-title siblings, in position order.
fn sibling_occurrence(conn: &Connection, child: &StoredNote) -> RepoResult<usize> {
    let Some(parent_id) = child.parent_id else {
        return Ok(0);
    };
    let siblings = load_children(conn, parent_id)?;
    siblings
        .iter()
        .filter(|sibling| sibling.title == child.title)
        .position(|sibling| sibling.id == child.id)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "child {} missing from sibling list at position {}",
                child.id, child.position
            ))
        })
}

fn missing_backing_line(child: &StoredNote) -> RepoError {
    RepoError::InvalidData(format!(
        "child {} has no backing checkbox line in its parent",
        child.id
    ))
}

/// Aligns the children of `parent_id` with the checklist parsed from
/// `content`. Runs inside the caller's transaction.
fn reconcile_in(conn: &Connection, parent_id: NoteId, content: &str) -> RepoResult<ReconcileOutcome> {
    let items = checklist::parse_checklist(content);
    let existing = load_children(conn, parent_id)?;
    let plan = checklist::plan_reconcile(&existing, &items);
    if plan.is_empty() {
        return Ok(ReconcileOutcome::default());
    }

    apply_plan(conn, parent_id, &plan)?;
    let outcome = plan.outcome();
    debug!(
        "event=checklist_reconcile module=repo status=ok parent_id={} created={} updated={} removed={}",
        parent_id, outcome.created, outcome.updated, outcome.removed
    );
    Ok(outcome)
}

fn apply_plan(conn: &Connection, parent_id: NoteId, plan: &ReconcilePlan) -> RepoResult<()> {
    for id in &plan.remove {
        conn.execute("DELETE FROM notes WHERE id = ?1;", [id.to_string()])?;
    }

    for update in &plan.update {
        conn.execute(
            "UPDATE notes
             SET is_done = ?2,
                 position = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                update.id.to_string(),
                flag_to_db(update.is_done),
                update.position
            ],
        )?;
    }

    for child in &plan.create {
        conn.execute(
            "INSERT INTO notes (id, parent_id, title, content, is_done, position)
             VALUES (?1, ?2, ?3, '', ?4, ?5);",
            params![
                Uuid::new_v4().to_string(),
                parent_id.to_string(),
                child.title.as_str(),
                flag_to_db(child.is_done),
                child.position,
            ],
        )?;
    }

    Ok(())
}

fn query_notes(
    conn: &Connection,
    sql: &str,
    parent_id: Option<NoteId>,
) -> RepoResult<Vec<NoteRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = match parent_id {
        Some(parent_id) => stmt.query([parent_id.to_string()])?,
        None => stmt.query([])?,
    };
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(parse_note_row(row)?);
    }
    Ok(notes)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<NoteRecord> {
    let id_text: String = row.get("id")?;
    let parent_text: Option<String> = row.get("parent_id")?;
    Ok(NoteRecord {
        id: parse_id(&id_text)?,
        parent_id: parent_text.as_deref().map(parse_id).transpose()?,
        title: row.get("title")?,
        content: row.get("content")?,
        is_done: parse_flag(row.get("is_done")?, "notes.is_done")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        child_count: row.get("child_count")?,
    })
}

fn parse_id(value: &str) -> RepoResult<NoteId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in notes")))
}

use rusqlite::Connection;
use tomatxt_core::db::open_db_in_memory;
use tomatxt_core::{NoteRepository, NoteService, NoteServiceError, RepoError, SqliteNoteRepository};
use uuid::Uuid;

fn service(conn: &Connection) -> NoteService<SqliteNoteRepository<'_>> {
    NoteService::new(SqliteNoteRepository::try_new(conn).unwrap())
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let created = notes.create("Groceries", "buy things").unwrap();
    let loaded = notes.get(created.id).unwrap();

    assert_eq!(loaded, created);
    assert_eq!(loaded.title, "Groceries");
    assert_eq!(loaded.content, "buy things");
    assert_eq!(loaded.parent_id, None);
    assert!(!loaded.is_done);
    assert_eq!(loaded.child_count, 0);
    assert!(loaded.created_at > 0);
    assert!(loaded.updated_at >= loaded.created_at);
}

#[test]
fn empty_title_and_content_are_accepted_for_top_level_notes() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let created = notes.create("", "").unwrap();
    assert_eq!(created.title, "");
    assert_eq!(created.content_preview, "");
}

#[test]
fn top_level_listing_keeps_creation_order_and_hides_children() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let first = notes.create("first", "- [ ] a\n- [ ] b").unwrap();
    let second = notes.create("second", "plain").unwrap();
    let third = notes.create("third", "- [x] c").unwrap();

    let listed = notes.list_top_level().unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|note| note.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);

    let counts: Vec<u32> = listed.iter().map(|note| note.child_count).collect();
    assert_eq!(counts, vec![2, 0, 1]);
}

#[test]
fn list_top_level_on_empty_store_is_empty() {
    let conn = open_db_in_memory().unwrap();
    assert!(service(&conn).list_top_level().unwrap().is_empty());
}

#[test]
fn unknown_ids_report_not_found() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);
    let missing = Uuid::new_v4();

    assert!(matches!(
        notes.get(missing),
        Err(NoteServiceError::NoteNotFound(id)) if id == missing
    ));
    assert!(matches!(
        notes.update(missing, "x", "y"),
        Err(NoteServiceError::NoteNotFound(_))
    ));
    assert!(matches!(
        notes.delete(missing),
        Err(NoteServiceError::NoteNotFound(_))
    ));
    assert!(matches!(
        notes.list_children(missing),
        Err(NoteServiceError::NoteNotFound(_))
    ));
    assert!(matches!(
        notes.set_done(missing, true),
        Err(NoteServiceError::NoteNotFound(_))
    ));
}

#[test]
fn update_replaces_title_and_content() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let created = notes.create("draft", "old body").unwrap();
    let updated = notes.update(created.id, "final", "new body").unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "final");
    assert_eq!(updated.content, "new body");
    assert_eq!(updated.created_at, created.created_at);
}

#[test]
fn projections_follow_content() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let body = format!("intro\n- [ ] task\n{}", "word ".repeat(40));
    let created = notes.create("long", &body).unwrap();

    assert!(!created.content_without_checkboxes.contains("[ ]"));
    assert!(created.content_without_checkboxes.starts_with("intro"));
    assert!(created.content_preview.ends_with("..."));
    assert_eq!(created.content_preview.chars().count(), 103);
    assert!(!created.content_preview.contains('\n'));
}

#[test]
fn top_level_done_flag_is_stored_directly() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let created = notes.create("errand", "- [ ] step").unwrap();
    let done = notes.set_done(created.id, true).unwrap();

    assert!(done.is_done);
    assert_eq!(done.content, "- [ ] step");
    assert!(!notes.set_done(created.id, false).unwrap().is_done);
}

#[test]
fn delete_removes_note_and_children() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let parent = notes.create("list", "- [ ] a\n- [ ] b").unwrap();
    let keep = notes.create("other", "").unwrap();
    notes.delete(parent.id).unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 1);
    assert_eq!(notes.list_top_level().unwrap()[0].id, keep.id);
}

#[test]
fn repository_reports_not_found_for_missing_parent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    assert!(matches!(
        repo.list_children(missing),
        Err(RepoError::NotFound(id)) if id == missing
    ));
    assert!(repo.get_note(missing).unwrap().is_none());
}

#[test]
fn reconcile_on_unchanged_content_touches_nothing() {
    let conn = open_db_in_memory().unwrap();
    let notes = service(&conn);

    let parent = notes.create("list", "- [ ] a\n- [x] b").unwrap();
    let outcome = notes.reconcile(parent.id).unwrap();

    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.removed, 0);
}

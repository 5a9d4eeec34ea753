//! Tests for note CRUD: per-folder title uniqueness, default-title
//! generation, block hydration on fetch, metadata moves, and delete
//! cleanup of blocks and payload rows.

use crate::test_fixtures::TestDatabase;
use crate::{BlockContent, BlockKind, BlockRepository, Error, FolderRepository, NoteRepository};
use uuid::Uuid;

/// Count the rows of a table directly, bypassing the repositories.
async fn table_count(pool: &sqlx::Pool<sqlx::Sqlite>, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

fn raw(s: &str) -> Box<serde_json::value::RawValue> {
    serde_json::value::RawValue::from_string(s.to_string()).expect("valid test JSON")
}

// =============================================================================
// Creation Tests
// =============================================================================

#[tokio::test]
async fn test_create_note_defaults_to_root_folder() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let root = test_db.db.folders.root().await.unwrap();
    let note = notes.create(Some("Ideas"), None).await.expect("create");
    assert_eq!(note.folder_id, root.id);
    assert_eq!(note.title, "Ideas");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_create_note_in_folder() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let work = test_db.db.folders.create(Some("Work"), None).await.unwrap();
    let note = notes
        .create(Some("Meeting"), Some(work.id))
        .await
        .expect("create in folder");
    assert_eq!(note.folder_id, work.id);

    let detail = test_db.db.folders.get(work.id).await.unwrap();
    assert!(detail.notes.iter().any(|n| n.id == note.id));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_create_note_missing_folder_fails() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let fake = Uuid::new_v4();
    let result = notes.create(Some("Lost"), Some(fake)).await;
    assert!(matches!(result, Err(Error::FolderNotFound(id)) if id == fake));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_title_in_folder_fails() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    notes.create(Some("Journal"), None).await.unwrap();
    let result = notes.create(Some("Journal"), None).await;
    assert!(matches!(result, Err(Error::DuplicateName(ref t)) if t == "Journal"));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_same_title_in_different_folders() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let a = test_db.db.folders.create(Some("A"), None).await.unwrap();
    let b = test_db.db.folders.create(Some("B"), None).await.unwrap();

    notes
        .create(Some("Journal"), Some(a.id))
        .await
        .expect("Journal in A");
    notes
        .create(Some("Journal"), Some(b.id))
        .await
        .expect("Journal in B is a different folder");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_generated_titles_increment() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let first = notes.create(None, None).await.expect("first default");
    assert_eq!(first.title, "New Note");
    let second = notes.create(None, None).await.expect("second default");
    assert_eq!(second.title, "New Note 2");
    let third = notes.create(None, None).await.expect("third default");
    assert_eq!(third.title, "New Note 3");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_generated_title_continues_from_highest() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    notes.create(Some("New Note 7"), None).await.unwrap();
    let next = notes.create(None, None).await.expect("default after 7");
    assert_eq!(next.title, "New Note 8");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_empty_title_rejected() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let result = notes.create(Some(""), None).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    test_db.cleanup().await;
}

// =============================================================================
// Fetch Tests
// =============================================================================

#[tokio::test]
async fn test_get_note_with_no_blocks() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let note = notes.create(Some("Empty"), None).await.unwrap();
    let detail = notes.get(note.id).await.expect("fetch");
    assert_eq!(detail.title, "Empty");
    assert!(detail.blocks.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_get_note_hydrates_blocks_in_order() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;
    let blocks = &test_db.db.blocks;

    let note = notes.create(Some("Mixed"), None).await.unwrap();

    // Insert out of order; fetch must sort by index.
    let canvas = blocks
        .create(
            note.id,
            BlockKind::Canvas,
            1,
            Some(&raw(r#"{"data":{"strokes":[1,2]}}"#)),
        )
        .await
        .unwrap();
    let text = blocks
        .create(note.id, BlockKind::Text, 0, Some(&raw(r#"{"text":"intro"}"#)))
        .await
        .unwrap();
    let image = blocks
        .create(
            note.id,
            BlockKind::Image,
            2,
            Some(&raw(r#"{"path":"uploads/images/x.png","data":{"alt":"x"}}"#)),
        )
        .await
        .unwrap();

    let detail = notes.get(note.id).await.expect("fetch with blocks");
    assert_eq!(detail.blocks.len(), 3);
    let ids: Vec<Uuid> = detail.blocks.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![text.id, canvas.id, image.id]);

    match &detail.blocks[0].content {
        BlockContent::Text(p) => assert_eq!(p.text, "intro"),
        other => panic!("Expected text content, got {:?}", other),
    }
    match &detail.blocks[1].content {
        BlockContent::Canvas(p) => assert_eq!(p.data.get(), r#"{"strokes":[1,2]}"#),
        other => panic!("Expected canvas content, got {:?}", other),
    }
    match &detail.blocks[2].content {
        BlockContent::Image(p) => assert_eq!(p.path, "uploads/images/x.png"),
        other => panic!("Expected image content, got {:?}", other),
    }

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_get_missing_note_fails() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let fake = Uuid::new_v4();
    let result = notes.get(fake).await;
    assert!(matches!(result, Err(Error::NoteNotFound(id)) if id == fake));

    test_db.cleanup().await;
}

// =============================================================================
// Metadata Update Tests
// =============================================================================

#[tokio::test]
async fn test_rename_note() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let note = notes.create(Some("Old"), None).await.unwrap();
    let renamed = notes
        .update_metadata(note.id, Some("New"), None)
        .await
        .expect("rename");
    assert_eq!(renamed.title, "New");
    assert_eq!(renamed.folder_id, note.folder_id, "folder unchanged");
    assert_eq!(renamed.created_at_utc, note.created_at_utc);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_move_note_to_other_folder() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let work = test_db.db.folders.create(Some("Work"), None).await.unwrap();
    let note = notes.create(Some("Memo"), None).await.unwrap();

    let moved = notes
        .update_metadata(note.id, None, Some(work.id))
        .await
        .expect("move");
    assert_eq!(moved.folder_id, work.id);
    assert_eq!(moved.title, "Memo", "title unchanged by move");

    let detail = test_db.db.folders.get(work.id).await.unwrap();
    assert!(detail.notes.iter().any(|n| n.id == note.id));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_move_note_title_collision_fails() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let work = test_db.db.folders.create(Some("Work"), None).await.unwrap();
    notes.create(Some("Memo"), Some(work.id)).await.unwrap();
    let rooted = notes.create(Some("Memo"), None).await.unwrap();

    let result = notes.update_metadata(rooted.id, None, Some(work.id)).await;
    assert!(matches!(result, Err(Error::DuplicateName(_))));

    // Still in the root folder.
    let root = test_db.db.folders.root().await.unwrap();
    let fetched = notes.get(rooted.id).await.unwrap();
    assert_eq!(fetched.folder_id, root.id);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_move_note_missing_folder_fails() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let note = notes.create(Some("Memo"), None).await.unwrap();
    let fake = Uuid::new_v4();
    let result = notes.update_metadata(note.id, None, Some(fake)).await;
    assert!(matches!(result, Err(Error::FolderNotFound(id)) if id == fake));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_rename_note_to_own_title_succeeds() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let note = notes.create(Some("Memo"), None).await.unwrap();
    let updated = notes
        .update_metadata(note.id, Some("Memo"), None)
        .await
        .expect("no-op rename");
    assert_eq!(updated.title, "Memo");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_update_missing_note_fails() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let result = notes.update_metadata(Uuid::new_v4(), Some("X"), None).await;
    assert!(matches!(result, Err(Error::NoteNotFound(_))));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_empty_title_on_update_rejected() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let note = notes.create(Some("Memo"), None).await.unwrap();
    let result = notes.update_metadata(note.id, Some("  "), None).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    test_db.cleanup().await;
}

// =============================================================================
// Delete Tests
// =============================================================================

#[tokio::test]
async fn test_delete_note_removes_blocks_and_payloads() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;
    let blocks = &test_db.db.blocks;

    let note = notes.create(Some("Doomed"), None).await.unwrap();
    blocks
        .create(note.id, BlockKind::Text, 0, Some(&raw(r#"{"text":"a"}"#)))
        .await
        .unwrap();
    blocks
        .create(
            note.id,
            BlockKind::Canvas,
            1,
            Some(&raw(r#"{"data":{}}"#)),
        )
        .await
        .unwrap();

    notes.delete(note.id).await.expect("delete note");

    assert!(matches!(
        notes.get(note.id).await,
        Err(Error::NoteNotFound(_))
    ));
    let pool = &test_db.db.pool;
    assert_eq!(table_count(pool, "note").await, 0);
    assert_eq!(table_count(pool, "block").await, 0);
    assert_eq!(table_count(pool, "text_block").await, 0);
    assert_eq!(table_count(pool, "canvas_block").await, 0);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_delete_missing_note_fails() {
    let test_db = TestDatabase::new().await;
    let notes = &test_db.db.notes;

    let result = notes.delete(Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::NoteNotFound(_))));

    test_db.cleanup().await;
}

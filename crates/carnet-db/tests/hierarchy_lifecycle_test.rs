//! End-to-end lifecycle test across the public crate API: build a folder
//! tree, fill it with notes and typed blocks, edit and reorder content,
//! then tear a subtree down and verify nothing is left behind.

use carnet_db::test_fixtures::TestDatabase;
use carnet_db::{
    BlockContent, BlockKind, BlockMove, BlockRepository, FolderRepository, NoteRepository,
};
use serde_json::value::RawValue;

fn raw(s: &str) -> Box<RawValue> {
    RawValue::from_string(s.to_string()).expect("valid test JSON")
}

#[tokio::test]
async fn test_full_notebook_lifecycle() {
    let test_db = TestDatabase::new().await;
    let folders = &test_db.db.folders;
    let notes = &test_db.db.notes;
    let blocks = &test_db.db.blocks;

    // Root → Work → Drafts, plus a sibling folder that must survive.
    let work = folders
        .create(Some("Work"), None)
        .await
        .expect("Failed to create Work");
    let drafts = folders
        .create(Some("Drafts"), Some(work.id))
        .await
        .expect("Failed to create Drafts");
    let archive = folders
        .create(Some("Archive"), None)
        .await
        .expect("Failed to create Archive");

    // A note with one block of each kind.
    let note = notes
        .create(Some("Launch plan"), Some(drafts.id))
        .await
        .expect("Failed to create note");
    let intro = blocks
        .create(
            note.id,
            BlockKind::Text,
            0,
            Some(&raw(r#"{"text":"Goals for Q4"}"#)),
        )
        .await
        .expect("Failed to create text block");
    let sketch = blocks
        .create(
            note.id,
            BlockKind::Canvas,
            1,
            Some(&raw(r#"{"data":{"strokes":[[0,0],[4,2]]}}"#)),
        )
        .await
        .expect("Failed to create canvas block");
    let photo = blocks
        .create(
            note.id,
            BlockKind::Image,
            2,
            Some(&raw(
                r#"{"path":"uploads/images/whiteboard.jpg","data":{"alt":"whiteboard"}}"#,
            )),
        )
        .await
        .expect("Failed to create image block");

    // Edit the text, then turn the sketch into an image.
    blocks
        .update_content(
            note.id,
            intro.id,
            BlockKind::Text,
            Some(&raw(r#"{"text":"Goals for Q4 (revised)"}"#)),
        )
        .await
        .expect("Failed to update text block");
    blocks
        .update_content(
            note.id,
            sketch.id,
            BlockKind::Image,
            Some(&raw(
                r#"{"path":"uploads/images/sketch-export.png","data":{}}"#,
            )),
        )
        .await
        .expect("Failed to swap canvas to image");

    // Move the photo to the top.
    let moves = vec![
        BlockMove {
            id: photo.id,
            order_index: 0,
        },
        BlockMove {
            id: intro.id,
            order_index: 1,
        },
        BlockMove {
            id: sketch.id,
            order_index: 2,
        },
    ];
    blocks
        .reorder(note.id, &moves)
        .await
        .expect("Failed to reorder blocks");

    let detail = notes.get(note.id).await.expect("Failed to fetch note");
    assert_eq!(detail.title, "Launch plan");
    assert_eq!(detail.blocks.len(), 3);
    assert_eq!(detail.blocks[0].id, photo.id);
    match &detail.blocks[1].content {
        BlockContent::Text(p) => assert_eq!(p.text, "Goals for Q4 (revised)"),
        other => panic!("Expected text content, got {:?}", other),
    }
    match &detail.blocks[2].content {
        BlockContent::Image(p) => assert_eq!(p.path, "uploads/images/sketch-export.png"),
        other => panic!("Expected image content after swap, got {:?}", other),
    }

    // A note in the surviving folder.
    let keeper = notes
        .create(Some("Keep me"), Some(archive.id))
        .await
        .expect("Failed to create archived note");
    blocks
        .create(
            keeper.id,
            BlockKind::Text,
            0,
            Some(&raw(r#"{"text":"still here"}"#)),
        )
        .await
        .expect("Failed to create archived block");

    // Delete Work; Drafts and its note go with it.
    folders
        .delete(work.id)
        .await
        .expect("Failed to delete Work subtree");

    assert!(folders.get(work.id).await.is_err());
    assert!(folders.get(drafts.id).await.is_err());
    assert!(notes.get(note.id).await.is_err());

    // The archive and its contents are untouched.
    let archived = notes
        .get(keeper.id)
        .await
        .expect("Archived note should survive");
    assert_eq!(archived.blocks.len(), 1);

    // No orphaned rows of any kind.
    let pool = &test_db.db.pool;
    let blocks_left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM block")
        .fetch_one(pool)
        .await
        .expect("Failed to count blocks");
    assert_eq!(blocks_left, 1);
    let texts_left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM text_block")
        .fetch_one(pool)
        .await
        .expect("Failed to count text payloads");
    assert_eq!(texts_left, 1);
    let images_left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_block")
        .fetch_one(pool)
        .await
        .expect("Failed to count image payloads");
    assert_eq!(images_left, 0);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_default_names_fill_a_fresh_workspace() {
    let test_db = TestDatabase::new().await;
    let folders = &test_db.db.folders;
    let notes = &test_db.db.notes;

    // Simulate a user mashing "new" a few times.
    let f1 = folders.create(None, None).await.expect("first folder");
    let f2 = folders.create(None, None).await.expect("second folder");
    let n1 = notes.create(None, Some(f1.id)).await.expect("first note");
    let n2 = notes.create(None, Some(f1.id)).await.expect("second note");
    let n3 = notes.create(None, Some(f2.id)).await.expect("note elsewhere");

    assert_eq!(f1.name, "New Folder");
    assert_eq!(f2.name, "New Folder 2");
    assert_eq!(n1.title, "New Note");
    assert_eq!(n2.title, "New Note 2");
    assert_eq!(n3.title, "New Note", "numbering is scoped per folder");

    test_db.cleanup().await;
}

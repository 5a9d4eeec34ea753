//! Repository traits implemented by the storage layer.

use async_trait::async_trait;
use serde_json::value::RawValue;
use uuid::Uuid;

use crate::content::BlockKind;
use crate::error::Result;
use crate::models::{Block, BlockMove, Folder, FolderDetail, Note, NoteDetail};

/// Storage operations on the folder hierarchy.
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Create a folder under `parent_id`, or under the root when no parent
    /// is given. A missing name is auto-generated; an explicit name that
    /// collides with a sibling fails with `Error::DuplicateName`.
    async fn create(&self, name: Option<&str>, parent_id: Option<Uuid>) -> Result<Folder>;

    /// Fetch a folder with shallow previews of its child folders and notes.
    async fn get(&self, id: Uuid) -> Result<FolderDetail>;

    /// Rename and/or move a folder. Moving under a descendant of itself or
    /// touching the root fails with `Error::InvalidInput`.
    async fn update(&self, id: Uuid, name: Option<&str>, parent_id: Option<Uuid>)
        -> Result<Folder>;

    /// Delete a folder and everything beneath it: child folders
    /// recursively, their notes, and every block payload. All-or-nothing.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// The root folder, i.e. the single folder without a parent.
    async fn root(&self) -> Result<Folder>;
}

/// Storage operations on notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Create a note in `folder_id`, or in the root folder when no folder
    /// is given. A missing title is auto-generated; an explicit title that
    /// collides within the folder fails with `Error::DuplicateName`.
    async fn create(&self, title: Option<&str>, folder_id: Option<Uuid>) -> Result<Note>;

    /// Fetch a note with its blocks, payloads decoded, ordered by index.
    async fn get(&self, id: Uuid) -> Result<NoteDetail>;

    /// Retitle and/or move a note. The destination folder must exist and
    /// the title must stay unique there.
    async fn update_metadata(
        &self,
        id: Uuid,
        title: Option<&str>,
        folder_id: Option<Uuid>,
    ) -> Result<Note>;

    /// Delete a note and its blocks.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Storage operations on the content blocks of a note.
#[async_trait]
pub trait BlockRepository: Send + Sync {
    /// Append a block to `note_id` at `order_index`. The raw content is
    /// validated against `kind` before anything is written.
    async fn create(
        &self,
        note_id: Uuid,
        kind: BlockKind,
        order_index: i64,
        content: Option<&RawValue>,
    ) -> Result<Block>;

    /// Replace a block's content, switching its kind when the new content
    /// is of a different one. The old payload row and the new one are
    /// swapped in a single transaction.
    async fn update_content(
        &self,
        note_id: Uuid,
        block_id: Uuid,
        kind: BlockKind,
        content: Option<&RawValue>,
    ) -> Result<Block>;

    /// Delete a block and its payload row.
    async fn delete(&self, note_id: Uuid, block_id: Uuid) -> Result<()>;

    /// Apply a batch of index moves atomically. Any move that names a
    /// block not in `note_id` rolls the whole batch back.
    async fn reorder(&self, note_id: Uuid, moves: &[BlockMove]) -> Result<()>;
}

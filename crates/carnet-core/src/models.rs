//! Domain models shared across the storage and API layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{BlockContent, BlockKind};

/// A folder in the hierarchy.
///
/// Exactly one folder has no parent: the root, created at startup. Every
/// other folder points at an existing parent, and names are unique among
/// the children of a given parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Shallow child-folder listing inside a [`FolderDetail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderPreview {
    pub id: Uuid,
    pub name: String,
}

/// Shallow note listing inside a [`FolderDetail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotePreview {
    pub id: Uuid,
    pub title: String,
}

/// A folder together with one level of its contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderDetail {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    pub folders: Vec<FolderPreview>,
    pub notes: Vec<NotePreview>,
}

/// A note. Titles are unique among the notes of one folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub folder_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// A content block without its payload. `order_index` positions the block
/// within its note; the API exposes it as `index` and the kind as `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: Uuid,
    pub note_id: Uuid,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(rename = "index")]
    pub order_index: i64,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// A block with its decoded payload, as returned inside a [`NoteDetail`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDetail {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(rename = "index")]
    pub order_index: i64,
    pub content: BlockContent,
}

/// A note with its blocks in ascending order-index order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDetail {
    pub id: Uuid,
    pub title: String,
    pub folder_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    pub blocks: Vec<BlockDetail>,
}

/// One entry of a block reorder request: move block `id` to `order_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMove {
    pub id: Uuid,
    #[serde(rename = "index")]
    pub order_index: i64,
}

//! Note repository implementation.
//!
//! Every note lives in exactly one folder (the root when none is named at
//! creation) and owns an ordered list of blocks. Deleting a note takes its
//! blocks and their payload rows down with it in one transaction.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::value::RawValue;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, Transaction};
use uuid::Uuid;

use carnet_core::{
    new_v7, next_available_name, BlockContent, BlockDetail, BlockKind, CanvasPayload, Error,
    ImagePayload, Note, NoteDetail, NoteRepository, Result, TextPayload, DEFAULT_NOTE_BASE,
};

use crate::folders::{fetch_folder_tx, root_folder_tx};

/// SQLite implementation of NoteRepository.
pub struct SqliteNoteRepository {
    pool: Pool<Sqlite>,
}

impl SqliteNoteRepository {
    /// Create a new SqliteNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    async fn create(&self, title: Option<&str>, folder_id: Option<Uuid>) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let folder = match folder_id {
            Some(fid) => fetch_folder_tx(&mut tx, fid)
                .await?
                .ok_or(Error::FolderNotFound(fid))?,
            None => root_folder_tx(&mut tx)
                .await?
                .ok_or_else(|| Error::NotFound("root folder".to_string()))?,
        };

        let title = match title {
            Some(t) if t.trim().is_empty() => {
                return Err(Error::InvalidInput(
                    "note title must not be empty".to_string(),
                ))
            }
            Some(t) => {
                if note_title_exists_tx(&mut tx, folder.id, t, None).await? {
                    return Err(Error::DuplicateName(t.to_string()));
                }
                t.to_string()
            }
            None => {
                let titles = folder_note_titles_tx(&mut tx, folder.id).await?;
                next_available_name(DEFAULT_NOTE_BASE, &titles)
            }
        };

        let id = new_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO note (id, title, folder_id, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&title)
        .bind(folder.id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        Ok(Note {
            id,
            title,
            folder_id: folder.id,
            created_at_utc: now,
            updated_at_utc: now,
        })
    }

    async fn get(&self, id: Uuid) -> Result<NoteDetail> {
        let note = sqlx::query(
            "SELECT id, title, folder_id, created_at_utc, updated_at_utc
             FROM note WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .map(note_from_row)
        .ok_or(Error::NoteNotFound(id))?;

        let rows = sqlx::query(
            r#"
            SELECT b.id, b.kind, b.order_index,
                   t.body AS text_body,
                   c.data AS canvas_data,
                   i.path AS image_path, i.data AS image_data
            FROM block b
            LEFT JOIN text_block t ON t.block_id = b.id
            LEFT JOIN canvas_block c ON c.block_id = b.id
            LEFT JOIN image_block i ON i.block_id = b.id
            WHERE b.note_id = $1
            ORDER BY b.order_index ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut blocks = Vec::with_capacity(rows.len());
        for r in rows {
            let kind_tag: String = r.get("kind");
            let kind = kind_tag.parse::<BlockKind>()?;
            let content = match kind {
                BlockKind::Text => {
                    let body: Option<String> = r.get("text_body");
                    let body = body.ok_or_else(|| missing_payload(r.get("id"), kind))?;
                    BlockContent::Text(TextPayload { text: body })
                }
                BlockKind::Canvas => {
                    let data: Option<String> = r.get("canvas_data");
                    let data = data.ok_or_else(|| missing_payload(r.get("id"), kind))?;
                    BlockContent::Canvas(CanvasPayload {
                        data: RawValue::from_string(data)?,
                    })
                }
                BlockKind::Image => {
                    let path: Option<String> = r.get("image_path");
                    let data: Option<String> = r.get("image_data");
                    match (path, data) {
                        (Some(path), Some(data)) => BlockContent::Image(ImagePayload {
                            path,
                            data: RawValue::from_string(data)?,
                        }),
                        _ => return Err(missing_payload(r.get("id"), kind)),
                    }
                }
            };
            blocks.push(BlockDetail {
                id: r.get("id"),
                kind,
                order_index: r.get("order_index"),
                content,
            });
        }

        Ok(NoteDetail {
            id: note.id,
            title: note.title,
            folder_id: note.folder_id,
            created_at_utc: note.created_at_utc,
            updated_at_utc: note.updated_at_utc,
            blocks,
        })
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        title: Option<&str>,
        folder_id: Option<Uuid>,
    ) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let note = fetch_note_tx(&mut tx, id)
            .await?
            .ok_or(Error::NoteNotFound(id))?;

        // Unspecified fields keep their stored value.
        let new_folder_id = match folder_id {
            Some(fid) => {
                if fetch_folder_tx(&mut tx, fid).await?.is_none() {
                    return Err(Error::FolderNotFound(fid));
                }
                fid
            }
            None => note.folder_id,
        };

        let new_title = match title {
            Some(t) if t.trim().is_empty() => {
                return Err(Error::InvalidInput(
                    "note title must not be empty".to_string(),
                ))
            }
            Some(t) => t.to_string(),
            None => note.title.clone(),
        };

        if note_title_exists_tx(&mut tx, new_folder_id, &new_title, Some(id)).await? {
            return Err(Error::DuplicateName(new_title));
        }

        let now = Utc::now();
        sqlx::query("UPDATE note SET title = $1, folder_id = $2, updated_at_utc = $3 WHERE id = $4")
            .bind(&new_title)
            .bind(new_folder_id)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        Ok(Note {
            id,
            title: new_title,
            folder_id: new_folder_id,
            created_at_utc: note.created_at_utc,
            updated_at_utc: now,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        fetch_note_tx(&mut tx, id)
            .await?
            .ok_or(Error::NoteNotFound(id))?;

        delete_note_contents_tx(&mut tx, id).await?;
        sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

fn missing_payload(id: Uuid, kind: BlockKind) -> Error {
    Error::Serialization(format!("block {} is missing its {} payload", id, kind))
}

pub(crate) fn note_from_row(r: SqliteRow) -> Note {
    Note {
        id: r.get("id"),
        title: r.get("title"),
        folder_id: r.get("folder_id"),
        created_at_utc: r.get("created_at_utc"),
        updated_at_utc: r.get("updated_at_utc"),
    }
}

/// Fetch a note by ID within an existing transaction.
pub(crate) async fn fetch_note_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: Uuid,
) -> Result<Option<Note>> {
    let row = sqlx::query(
        "SELECT id, title, folder_id, created_at_utc, updated_at_utc
         FROM note WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(row.map(note_from_row))
}

/// Whether a note in `folder_id` already uses `title`, optionally excluding
/// one note (the one being retitled).
pub(crate) async fn note_title_exists_tx(
    tx: &mut Transaction<'_, Sqlite>,
    folder_id: Uuid,
    title: &str,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT id FROM note
         WHERE folder_id = $1 AND title = $2 AND ($3 IS NULL OR id <> $3)",
    )
    .bind(folder_id)
    .bind(title)
    .bind(exclude)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(row.is_some())
}

/// Titles of all notes directly in `folder_id`.
pub(crate) async fn folder_note_titles_tx(
    tx: &mut Transaction<'_, Sqlite>,
    folder_id: Uuid,
) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT title FROM note WHERE folder_id = $1")
        .bind(folder_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

    Ok(rows.into_iter().map(|r| r.get("title")).collect())
}

/// Delete every block of `note_id` together with its payload rows, leaving
/// the note row itself in place.
pub(crate) async fn delete_note_contents_tx(
    tx: &mut Transaction<'_, Sqlite>,
    note_id: Uuid,
) -> Result<()> {
    for table in ["text_block", "canvas_block", "image_block"] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE block_id IN (SELECT id FROM block WHERE note_id = $1)",
            table
        ))
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    }

    sqlx::query("DELETE FROM block WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    Ok(())
}

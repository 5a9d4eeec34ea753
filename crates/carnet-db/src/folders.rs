//! Folder repository implementation.
//!
//! Folders form a single rooted tree. The root is the one row with a NULL
//! parent; it is created at startup and can be neither moved nor deleted.
//! Sibling-name uniqueness and acyclicity are enforced here, inside the
//! same transaction as the write they protect.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, Transaction};
use tracing::info;
use uuid::Uuid;

use carnet_core::{
    new_v7, next_available_name, Error, Folder, FolderDetail, FolderPreview, FolderRepository,
    NotePreview, Result, DEFAULT_FOLDER_BASE,
};

/// SQLite implementation of FolderRepository.
pub struct SqliteFolderRepository {
    pool: Pool<Sqlite>,
}

impl SqliteFolderRepository {
    /// Create a new SqliteFolderRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Ensure the root folder exists, creating it on first startup.
    ///
    /// Idempotent: returns the existing root when one is already present.
    pub async fn ensure_root(&self) -> Result<Folder> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        if let Some(root) = root_folder_tx(&mut tx).await? {
            tx.commit().await.map_err(Error::Database)?;
            return Ok(root);
        }

        let id = new_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO folder (id, name, parent_id, created_at_utc, updated_at_utc)
             VALUES ($1, $2, NULL, $3, $4)",
        )
        .bind(id)
        .bind("Root")
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "folders",
            op = "ensure_root",
            folder_id = %id,
            "Created root folder"
        );

        Ok(Folder {
            id,
            name: "Root".to_string(),
            parent_id: None,
            created_at_utc: now,
            updated_at_utc: now,
        })
    }
}

#[async_trait]
impl FolderRepository for SqliteFolderRepository {
    async fn create(&self, name: Option<&str>, parent_id: Option<Uuid>) -> Result<Folder> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let parent = match parent_id {
            Some(pid) => fetch_folder_tx(&mut tx, pid)
                .await?
                .ok_or(Error::ParentNotFound(pid))?,
            None => root_folder_tx(&mut tx)
                .await?
                .ok_or_else(|| Error::NotFound("root folder".to_string()))?,
        };

        let name = match name {
            Some(n) if n.trim().is_empty() => {
                return Err(Error::InvalidInput(
                    "folder name must not be empty".to_string(),
                ))
            }
            Some(n) => {
                if sibling_name_exists_tx(&mut tx, Some(parent.id), n, None).await? {
                    return Err(Error::DuplicateName(n.to_string()));
                }
                n.to_string()
            }
            None => {
                let siblings = child_folder_names_tx(&mut tx, parent.id).await?;
                next_available_name(DEFAULT_FOLDER_BASE, &siblings)
            }
        };

        let id = new_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO folder (id, name, parent_id, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&name)
        .bind(parent.id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        Ok(Folder {
            id,
            name,
            parent_id: Some(parent.id),
            created_at_utc: now,
            updated_at_utc: now,
        })
    }

    async fn get(&self, id: Uuid) -> Result<FolderDetail> {
        let folder = sqlx::query(
            "SELECT id, name, parent_id, created_at_utc, updated_at_utc
             FROM folder WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .map(folder_from_row)
        .ok_or_else(|| Error::NotFound(format!("folder {}", id)))?;

        let folders = sqlx::query("SELECT id, name FROM folder WHERE parent_id = $1 ORDER BY name")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?
            .into_iter()
            .map(|r| FolderPreview {
                id: r.get("id"),
                name: r.get("name"),
            })
            .collect();

        let notes = sqlx::query("SELECT id, title FROM note WHERE folder_id = $1 ORDER BY title")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?
            .into_iter()
            .map(|r| NotePreview {
                id: r.get("id"),
                title: r.get("title"),
            })
            .collect();

        Ok(FolderDetail {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parent_id,
            created_at_utc: folder.created_at_utc,
            updated_at_utc: folder.updated_at_utc,
            folders,
            notes,
        })
    }

    async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> Result<Folder> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let folder = fetch_folder_tx(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {}", id)))?;

        // Unspecified fields keep their stored value.
        let new_parent_id = match parent_id {
            Some(pid) => {
                if folder.parent_id.is_none() {
                    return Err(Error::InvalidInput(
                        "the root folder cannot be moved".to_string(),
                    ));
                }
                if fetch_folder_tx(&mut tx, pid).await?.is_none() {
                    return Err(Error::ParentNotFound(pid));
                }
                // A parent inside the moved folder's own subtree would
                // detach the subtree into a cycle.
                if is_descendant_tx(&mut tx, pid, id).await? {
                    return Err(Error::InvalidInput(
                        "cannot move a folder into its own subtree".to_string(),
                    ));
                }
                Some(pid)
            }
            None => folder.parent_id,
        };

        let new_name = match name {
            Some(n) if n.trim().is_empty() => {
                return Err(Error::InvalidInput(
                    "folder name must not be empty".to_string(),
                ))
            }
            Some(n) => n.to_string(),
            None => folder.name.clone(),
        };

        if sibling_name_exists_tx(&mut tx, new_parent_id, &new_name, Some(id)).await? {
            return Err(Error::DuplicateName(new_name));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE folder SET name = $1, parent_id = $2, updated_at_utc = $3 WHERE id = $4",
        )
        .bind(&new_name)
        .bind(new_parent_id)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        Ok(Folder {
            id,
            name: new_name,
            parent_id: new_parent_id,
            created_at_utc: folder.created_at_utc,
            updated_at_utc: now,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let folder = fetch_folder_tx(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("folder {}", id)))?;
        if folder.parent_id.is_none() {
            return Err(Error::InvalidInput(
                "the root folder cannot be deleted".to_string(),
            ));
        }

        let subtree = collect_subtree_tx(&mut tx, id).await?;

        // Subtree is collected parents-first; delete in reverse so every
        // folder's children are gone before its own row.
        for folder_id in subtree.iter().rev() {
            delete_folder_notes_tx(&mut tx, *folder_id).await?;
            sqlx::query("DELETE FROM folder WHERE id = $1")
                .bind(folder_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "folders",
            op = "delete_subtree",
            folder_id = %id,
            folder_count = subtree.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Deleted folder subtree"
        );

        Ok(())
    }

    async fn root(&self) -> Result<Folder> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let root = root_folder_tx(&mut tx).await?;
        tx.commit().await.map_err(Error::Database)?;
        root.ok_or_else(|| Error::NotFound("root folder".to_string()))
    }
}

pub(crate) fn folder_from_row(r: SqliteRow) -> Folder {
    Folder {
        id: r.get("id"),
        name: r.get("name"),
        parent_id: r.get("parent_id"),
        created_at_utc: r.get("created_at_utc"),
        updated_at_utc: r.get("updated_at_utc"),
    }
}

/// Fetch a folder by ID within an existing transaction.
pub(crate) async fn fetch_folder_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: Uuid,
) -> Result<Option<Folder>> {
    let row = sqlx::query(
        "SELECT id, name, parent_id, created_at_utc, updated_at_utc
         FROM folder WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(row.map(folder_from_row))
}

/// Fetch the root folder (NULL parent) within an existing transaction.
pub(crate) async fn root_folder_tx(tx: &mut Transaction<'_, Sqlite>) -> Result<Option<Folder>> {
    let row = sqlx::query(
        "SELECT id, name, parent_id, created_at_utc, updated_at_utc
         FROM folder WHERE parent_id IS NULL",
    )
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(row.map(folder_from_row))
}

/// Whether a sibling under `parent_id` already uses `name`, optionally
/// excluding one folder (the one being renamed).
pub(crate) async fn sibling_name_exists_tx(
    tx: &mut Transaction<'_, Sqlite>,
    parent_id: Option<Uuid>,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let row = match parent_id {
        Some(pid) => {
            sqlx::query(
                "SELECT id FROM folder
                 WHERE parent_id = $1 AND name = $2 AND ($3 IS NULL OR id <> $3)",
            )
            .bind(pid)
            .bind(name)
            .bind(exclude)
            .fetch_optional(&mut **tx)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id FROM folder
                 WHERE parent_id IS NULL AND name = $1 AND ($2 IS NULL OR id <> $2)",
            )
            .bind(name)
            .bind(exclude)
            .fetch_optional(&mut **tx)
            .await
        }
    }
    .map_err(Error::Database)?;

    Ok(row.is_some())
}

/// Names of all direct child folders of `parent_id`.
pub(crate) async fn child_folder_names_tx(
    tx: &mut Transaction<'_, Sqlite>,
    parent_id: Uuid,
) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM folder WHERE parent_id = $1")
        .bind(parent_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

    Ok(rows.into_iter().map(|r| r.get("name")).collect())
}

/// Whether `candidate` lies inside the subtree rooted at `ancestor`
/// (inclusive: a folder is its own descendant). Walks the parent chain
/// upward from `candidate` until the root.
pub(crate) async fn is_descendant_tx(
    tx: &mut Transaction<'_, Sqlite>,
    candidate: Uuid,
    ancestor: Uuid,
) -> Result<bool> {
    let mut cursor = Some(candidate);
    while let Some(current) = cursor {
        if current == ancestor {
            return Ok(true);
        }
        cursor = sqlx::query("SELECT parent_id FROM folder WHERE id = $1")
            .bind(current)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?
            .and_then(|row| row.get::<Option<Uuid>, _>("parent_id"));
    }
    Ok(false)
}

/// Collect the IDs of a folder subtree, parents before children.
async fn collect_subtree_tx(tx: &mut Transaction<'_, Sqlite>, root_id: Uuid) -> Result<Vec<Uuid>> {
    let mut ordered = vec![root_id];
    let mut cursor = 0;
    while cursor < ordered.len() {
        let parent = ordered[cursor];
        cursor += 1;
        let rows = sqlx::query("SELECT id FROM folder WHERE parent_id = $1")
            .bind(parent)
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)?;
        for row in rows {
            ordered.push(row.get("id"));
        }
    }
    Ok(ordered)
}

/// Delete every note in `folder_id` along with its blocks and payload rows.
async fn delete_folder_notes_tx(tx: &mut Transaction<'_, Sqlite>, folder_id: Uuid) -> Result<()> {
    // Payload rows first, then block rows, then the notes themselves.
    for table in ["text_block", "canvas_block", "image_block"] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE block_id IN (
                 SELECT b.id FROM block b
                 JOIN note n ON b.note_id = n.id
                 WHERE n.folder_id = $1
             )",
            table
        ))
        .bind(folder_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    }

    sqlx::query("DELETE FROM block WHERE note_id IN (SELECT id FROM note WHERE folder_id = $1)")
        .bind(folder_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    sqlx::query("DELETE FROM note WHERE folder_id = $1")
        .bind(folder_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    Ok(())
}

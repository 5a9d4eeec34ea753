//! Block repository implementation.
//!
//! A block row carries the kind tag and order index; its content lives in
//! a per-kind payload table keyed by block ID. Every write validates the
//! content against the tag first and keeps row + payload consistent inside
//! one transaction, so a block is never left with a payload that does not
//! match its tag.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::value::RawValue;
use sqlx::{Pool, Row, Sqlite, Transaction};
use tracing::debug;
use uuid::Uuid;

use carnet_core::{
    new_v7, Block, BlockContent, BlockKind, BlockMove, BlockRepository, Error, Result,
};

/// SQLite implementation of BlockRepository.
pub struct SqliteBlockRepository {
    pool: Pool<Sqlite>,
}

impl SqliteBlockRepository {
    /// Create a new SqliteBlockRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockRepository for SqliteBlockRepository {
    async fn create(
        &self,
        note_id: Uuid,
        kind: BlockKind,
        order_index: i64,
        content: Option<&RawValue>,
    ) -> Result<Block> {
        // Validate the payload before anything touches the database.
        let content = BlockContent::decode(kind, content)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        note_exists_tx(&mut tx, note_id).await?;

        let id = new_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO block (id, note_id, kind, order_index, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(note_id)
        .bind(kind.as_str())
        .bind(order_index)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        insert_payload_tx(&mut tx, id, &content).await?;

        tx.commit().await.map_err(Error::Database)?;

        Ok(Block {
            id,
            note_id,
            kind,
            order_index,
            created_at_utc: now,
            updated_at_utc: now,
        })
    }

    async fn update_content(
        &self,
        note_id: Uuid,
        block_id: Uuid,
        kind: BlockKind,
        content: Option<&RawValue>,
    ) -> Result<Block> {
        let content = BlockContent::decode(kind, content)?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(
            "SELECT kind, order_index, created_at_utc FROM block WHERE id = $1 AND note_id = $2",
        )
        .bind(block_id)
        .bind(note_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("block {} in note {}", block_id, note_id)))?;

        let stored_tag: String = row.get("kind");
        let stored_kind = stored_tag.parse::<BlockKind>()?;
        let order_index: i64 = row.get("order_index");
        let created_at_utc = row.get("created_at_utc");

        let now = Utc::now();
        if stored_kind == kind {
            update_payload_tx(&mut tx, block_id, &content).await?;
            sqlx::query("UPDATE block SET updated_at_utc = $1 WHERE id = $2")
                .bind(now)
                .bind(block_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        } else {
            // Tag change: old payload out, tag updated, new payload in,
            // all under the same transaction.
            delete_payload_tx(&mut tx, block_id, stored_kind).await?;
            sqlx::query("UPDATE block SET kind = $1, updated_at_utc = $2 WHERE id = $3")
                .bind(kind.as_str())
                .bind(now)
                .bind(block_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            insert_payload_tx(&mut tx, block_id, &content).await?;

            debug!(
                subsystem = "database",
                component = "blocks",
                op = "swap_payload",
                block_id = %block_id,
                from = %stored_kind,
                to = %kind,
                "Swapped block payload kind"
            );
        }

        tx.commit().await.map_err(Error::Database)?;

        Ok(Block {
            id: block_id,
            note_id,
            kind,
            order_index,
            created_at_utc,
            updated_at_utc: now,
        })
    }

    async fn delete(&self, note_id: Uuid, block_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query("SELECT kind FROM block WHERE id = $1 AND note_id = $2")
            .bind(block_id)
            .bind(note_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("block {} in note {}", block_id, note_id)))?;

        let stored_kind = row.get::<String, _>("kind").parse::<BlockKind>()?;

        delete_payload_tx(&mut tx, block_id, stored_kind).await?;
        sqlx::query("DELETE FROM block WHERE id = $1")
            .bind(block_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn reorder(&self, note_id: Uuid, moves: &[BlockMove]) -> Result<()> {
        if moves.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        note_exists_tx(&mut tx, note_id).await?;

        let now = Utc::now();
        for mv in moves {
            let result = sqlx::query(
                "UPDATE block SET order_index = $1, updated_at_utc = $2
                 WHERE id = $3 AND note_id = $4",
            )
            .bind(mv.order_index)
            .bind(now)
            .bind(mv.id)
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back every earlier move.
                return Err(Error::NotFound(format!(
                    "block {} in note {}",
                    mv.id, note_id
                )));
            }
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "blocks",
            op = "reorder",
            note_id = %note_id,
            block_count = moves.len(),
            "Reordered blocks"
        );

        Ok(())
    }
}

/// Fail with `NoteNotFound` unless `note_id` exists.
async fn note_exists_tx(tx: &mut Transaction<'_, Sqlite>, note_id: Uuid) -> Result<()> {
    sqlx::query("SELECT id FROM note WHERE id = $1")
        .bind(note_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?
        .map(|_| ())
        .ok_or(Error::NoteNotFound(note_id))
}

/// Insert the typed payload row for `block_id`.
async fn insert_payload_tx(
    tx: &mut Transaction<'_, Sqlite>,
    block_id: Uuid,
    content: &BlockContent,
) -> Result<()> {
    match content {
        BlockContent::Text(p) => {
            sqlx::query("INSERT INTO text_block (block_id, body) VALUES ($1, $2)")
                .bind(block_id)
                .bind(&p.text)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
        BlockContent::Canvas(p) => {
            sqlx::query("INSERT INTO canvas_block (block_id, data) VALUES ($1, $2)")
                .bind(block_id)
                .bind(p.data.get())
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
        BlockContent::Image(p) => {
            sqlx::query("INSERT INTO image_block (block_id, path, data) VALUES ($1, $2, $3)")
                .bind(block_id)
                .bind(&p.path)
                .bind(p.data.get())
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
    }
    Ok(())
}

/// Overwrite the payload row of `block_id` in place (kind unchanged).
async fn update_payload_tx(
    tx: &mut Transaction<'_, Sqlite>,
    block_id: Uuid,
    content: &BlockContent,
) -> Result<()> {
    match content {
        BlockContent::Text(p) => {
            sqlx::query("UPDATE text_block SET body = $1 WHERE block_id = $2")
                .bind(&p.text)
                .bind(block_id)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
        BlockContent::Canvas(p) => {
            sqlx::query("UPDATE canvas_block SET data = $1 WHERE block_id = $2")
                .bind(p.data.get())
                .bind(block_id)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
        BlockContent::Image(p) => {
            sqlx::query("UPDATE image_block SET path = $1, data = $2 WHERE block_id = $3")
                .bind(&p.path)
                .bind(p.data.get())
                .bind(block_id)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
    }
    Ok(())
}

/// Remove the payload row of the given kind for `block_id`.
async fn delete_payload_tx(
    tx: &mut Transaction<'_, Sqlite>,
    block_id: Uuid,
    kind: BlockKind,
) -> Result<()> {
    let sql = match kind {
        BlockKind::Text => "DELETE FROM text_block WHERE block_id = $1",
        BlockKind::Canvas => "DELETE FROM canvas_block WHERE block_id = $1",
        BlockKind::Image => "DELETE FROM image_block WHERE block_id = $1",
    };
    sqlx::query(sql)
        .bind(block_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

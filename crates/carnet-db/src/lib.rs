//! # carnet-db
//!
//! SQLite database layer for carnet.
//!
//! This crate provides:
//! - Connection pool management (WAL journaling, foreign keys enabled)
//! - Repository implementations for folders, notes, and blocks
//! - Filesystem storage for uploaded image assets
//!
//! ## Example
//!
//! ```rust,ignore
//! use carnet_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://data/carnet.sqlite?mode=rwc").await?;
//!     db.migrate().await?;
//!     db.folders.ensure_root().await?;
//!
//!     let note = db.notes.create(Some("Hello"), None).await?;
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```

pub mod blocks;
pub mod file_storage;
pub mod folders;
pub mod notes;
pub mod pool;

#[cfg(test)]
mod tests;

// Test fixtures for integration tests. Gated on the `migrations` feature
// (a default feature) because provisioning a test database runs the
// embedded migrations.
#[cfg(feature = "migrations")]
pub mod test_fixtures;

// Re-export core types
pub use carnet_core::*;

// Re-export repository implementations
pub use blocks::SqliteBlockRepository;
pub use file_storage::{image_storage_path, FilesystemBackend, StorageBackend};
pub use folders::SqliteFolderRepository;
pub use notes::SqliteNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Sqlite>,
    /// Folder repository for the folder tree.
    pub folders: SqliteFolderRepository,
    /// Note repository for note CRUD.
    pub notes: SqliteNoteRepository,
    /// Block repository for note content blocks.
    pub blocks: SqliteBlockRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Sqlite>) -> Self {
        Self {
            folders: SqliteFolderRepository::new(pool.clone()),
            notes: SqliteNoteRepository::new(pool.clone()),
            blocks: SqliteBlockRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            folders: SqliteFolderRepository::new(self.pool.clone()),
            notes: SqliteNoteRepository::new(self.pool.clone()),
            blocks: SqliteBlockRepository::new(self.pool.clone()),
        }
    }
}

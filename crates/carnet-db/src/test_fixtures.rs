//! Test fixtures for database integration tests.
//!
//! Provides a disposable SQLite database per test: a fresh file in a
//! temporary directory, migrated and with the root folder bootstrapped.
//! Isolation is per-file, so tests never see each other's data and no
//! external database needs to be running.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carnet_db::test_fixtures::TestDatabase;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test_db = TestDatabase::new().await;
//!     let root = test_db.db.folders.ensure_root().await.expect("root");
//!
//!     // Run your tests...
//!
//!     test_db.cleanup().await;
//! }
//! ```

use std::time::Duration;

use tempfile::TempDir;

use crate::pool::create_pool_with_config;
use crate::{Database, PoolConfig};

/// Test database backed by a throwaway SQLite file.
pub struct TestDatabase {
    pub db: Database,
    // Owns the directory holding the database file; dropping it removes
    // everything.
    _dir: TempDir,
}

impl TestDatabase {
    /// Create a migrated test database with the root folder in place.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir for test database");
        let db_path = dir.path().join("carnet-test.sqlite");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());

        let config = PoolConfig::new()
            .max_connections(2)
            .connect_timeout(Duration::from_secs(5));

        let pool = create_pool_with_config(&url, config)
            .await
            .expect("Failed to create test database pool");

        let db = Database::new(pool);
        db.migrate().await.expect("Failed to run migrations");
        db.folders
            .ensure_root()
            .await
            .expect("Failed to bootstrap root folder");

        Self { db, _dir: dir }
    }

    /// Close the pool and remove the temporary directory.
    pub async fn cleanup(self) {
        self.db.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FolderRepository;

    #[tokio::test]
    async fn test_database_creation() {
        let test_db = TestDatabase::new().await;
        assert!(test_db.db.pool.size() > 0);
        test_db.cleanup().await;
    }

    #[tokio::test]
    async fn test_root_is_bootstrapped() {
        let test_db = TestDatabase::new().await;
        let root = test_db.db.folders.root().await.expect("root folder");
        assert!(root.parent_id.is_none());
        assert_eq!(root.name, "Root");
        test_db.cleanup().await;
    }

    #[tokio::test]
    async fn test_databases_are_isolated() {
        let a = TestDatabase::new().await;
        let b = TestDatabase::new().await;

        let folder = a
            .db
            .folders
            .create(Some("only in a"), None)
            .await
            .expect("create folder");

        let looked_up = b.db.folders.get(folder.id).await;
        assert!(looked_up.is_err());

        a.cleanup().await;
        b.cleanup().await;
    }
}

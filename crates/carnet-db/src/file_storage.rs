//! Filesystem storage for uploaded image assets.
//!
//! Uploaded images are written under the data directory and later served
//! back over HTTP by path; the database never stores the bytes, only the
//! path a client embedded in an image block's content.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use carnet_core::{sanitize_filename, Result};

/// Storage backend trait for different storage implementations.
///
/// Allows abstracting over filesystem, S3, or other storage providers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified path.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the specified path.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Filesystem storage backend rooted at a base directory.
#[derive(Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// The directory this backend writes under.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Validate that the storage backend can write, read, and delete files.
    ///
    /// Performs a full round-trip test at startup to catch filesystem issues
    /// (overlayfs quirks, permission errors, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join("uploads/.health-check");
        let test_file = test_dir.join("test.bin");

        // Step 1: Create directory
        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        // Step 2: Write file
        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        // Step 3: Read file
        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        // Step 4: Delete file and directory
        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        debug!(storage_path = %path, full_path = %full_path.display(), file_size = data.len(), "file_storage: write");

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "file_storage: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_storage: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "file_storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_storage: rename failed");
            e
        })?;

        // Set permissions to 0644 (rw-r--r--, no execute)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        Ok(fs::read(full_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);
        if tokio::fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path);
        Ok(tokio::fs::try_exists(full_path).await?)
    }
}

/// Generate the storage path for an uploaded image.
///
/// Path format: `uploads/images/{uuid-v4}_{sanitized-filename}`. The random
/// prefix keeps distinct uploads of the same filename from colliding; the
/// sanitized original name keeps the file recognizable on disk.
pub fn image_storage_path(original_filename: &str) -> String {
    format!(
        "uploads/images/{}_{}",
        Uuid::new_v4(),
        sanitize_filename(original_filename)
    )
}

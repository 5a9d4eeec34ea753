//! Error types for carnet.

use thiserror::Error;

/// Result type alias using carnet's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for carnet operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource addressed by the request is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note referenced as a block container is absent
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Folder referenced as a note container is absent
    #[error("Folder not found: {0}")]
    FolderNotFound(uuid::Uuid),

    /// Folder referenced as a parent is absent
    #[error("Parent folder not found: {0}")]
    ParentNotFound(uuid::Uuid),

    /// Sibling name/title uniqueness violated
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Block payload does not conform to the schema of its type tag
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Type tag outside the closed {text, canvas, image} set
    #[error("Unsupported block type: {0}")]
    UnsupportedType(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

//! # carnet-core
//!
//! Core types, traits, and abstractions for the carnet note store.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other carnet crates depend on.

pub mod content;
pub mod error;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod naming;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use content::{BlockContent, BlockKind, CanvasPayload, ImagePayload, TextPayload};
pub use error::{Error, Result};
pub use file_safety::sanitize_filename;
pub use models::*;
pub use naming::{next_available_name, DEFAULT_FOLDER_BASE, DEFAULT_NOTE_BASE};
pub use traits::*;
pub use uuid_utils::{extract_timestamp, is_v4, is_v7, new_v7};

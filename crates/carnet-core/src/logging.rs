//! Structured logging schema and field name constants for carnet.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (block rows, subtree walks) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → handler → store calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "database", "storage"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "folders", "notes", "blocks", "pool", "filesystem"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create_folder", "delete_subtree", "reorder_blocks"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Folder UUID being operated on.
pub const FOLDER_ID: &str = "folder_id";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Block UUID being operated on.
pub const BLOCK_ID: &str = "block_id";

/// Block kind tag ("text", "canvas", "image").
pub const BLOCK_KIND: &str = "block_kind";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned or affected by an operation.
pub const RESULT_COUNT: &str = "result_count";

/// Number of folders removed by a cascade delete.
pub const FOLDER_COUNT: &str = "folder_count";

/// Number of blocks touched by a batch operation.
pub const BLOCK_COUNT: &str = "block_count";

/// Byte length of an uploaded or stored file.
pub const FILE_SIZE: &str = "file_size";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";

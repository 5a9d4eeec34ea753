//! carnet-api - HTTP API server for carnet

use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::value::RawValue;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use carnet_core::{BlockKind, BlockMove, BlockRepository, FolderRepository, NoteRepository};
use carnet_db::{image_storage_path, Database, FilesystemBackend, StorageBackend};

/// Request body cap. Image uploads are the largest payloads this API accepts.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024; // 50 MB

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so request IDs sort chronologically in
/// logs and can be correlated across the handler and store layers.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    /// Filesystem store for uploaded image assets.
    assets: FilesystemBackend,
}

// =============================================================================
// CORS CONFIGURATION HELPER
// =============================================================================

/// Parse allowed origins from the comma-separated `ALLOWED_ORIGINS`
/// environment variable.
///
/// Defaults to the local development frontends when unset. Origins that do
/// not parse as header values are skipped with a warning.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string());

    if origins_str.trim().is_empty() {
        // Default origins
        return vec![
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://localhost:3000"),
        ];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "carnet_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carnet_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("carnet-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let data_path = std::env::var("DATA_PATH").unwrap_or_else(|_| "data".to_string());
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/carnet.sqlite?mode=rwc", data_path));
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "7474".to_string())
        .parse()
        .unwrap_or(7474);

    // The data directory holds the SQLite file and uploaded assets. SQLite
    // creates the database file on first open but not its parent directory.
    tokio::fs::create_dir_all(&data_path).await?;

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // The folder tree hangs off a single parentless root; create it on
    // first boot.
    let root = db.folders.ensure_root().await?;
    info!(folder_id = %root.id, "Root folder ready");

    // Initialize asset storage
    let assets = FilesystemBackend::new(&data_path);
    if let Err(e) = assets.validate().await {
        tracing::warn!("Asset storage validation failed: {} (image uploads may fail)", e);
    }
    info!("Asset storage initialized at {}", data_path);

    // Create app state
    let state = AppState { db, assets };

    // Build the router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Folder tree
        .route("/api/folders", post(create_folder).put(update_folder))
        .route("/api/folders/:id", get(get_folder).delete(delete_folder))
        // Notes
        .route("/api/notes", post(create_note))
        .route(
            "/api/notes/:id",
            get(get_note).put(update_note).delete(delete_note),
        )
        // Content blocks
        .route("/api/notes/:id/blocks", post(create_block))
        .route(
            "/api/notes/:id/blocks/:block_id",
            put(update_block).delete(delete_block),
        )
        // Image uploads, served back as static assets
        .route("/api/images", post(upload_image))
        .nest_service(
            "/uploads",
            ServeDir::new(std::path::Path::new(&data_path).join("uploads")),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        // axum caps request bodies at 2MB by default; both limits have to be
        // raised for image uploads to get through.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// FOLDER HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateFolderBody {
    name: Option<String>,
    parent_id: Option<Uuid>,
}

/// Create a folder, under the root when no parent is given
async fn create_folder(
    State(state): State<AppState>,
    Json(body): Json<CreateFolderBody>,
) -> Result<impl IntoResponse, ApiError> {
    let folder = state
        .db
        .folders
        .create(body.name.as_deref(), body.parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(folder)))
}

/// Fetch a folder with its immediate child folders and notes
async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.db.folders.get(id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
struct UpdateFolderBody {
    current_id: Uuid,
    name: Option<String>,
    parent_id: Option<Uuid>,
}

/// Rename and/or move a folder
async fn update_folder(
    State(state): State<AppState>,
    Json(body): Json<UpdateFolderBody>,
) -> Result<impl IntoResponse, ApiError> {
    let folder = state
        .db
        .folders
        .update(body.current_id, body.name.as_deref(), body.parent_id)
        .await?;

    Ok(Json(folder))
}

/// Delete a folder and everything beneath it
async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.folders.delete(id).await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// =============================================================================
// NOTE HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateNoteBody {
    title: Option<String>,
    folder_id: Option<Uuid>,
}

/// Create a note, in the root folder when no folder is given
async fn create_note(
    State(state): State<AppState>,
    Json(body): Json<CreateNoteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state
        .db
        .notes
        .create(body.title.as_deref(), body.folder_id)
        .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// Fetch a note with its blocks in display order
async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.db.notes.get(id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
struct UpdateNoteBody {
    title: Option<String>,
    folder_id: Option<Uuid>,
    /// Optional batch reorder applied after the metadata update.
    blocks: Option<Vec<BlockMove>>,
}

/// Retitle and/or move a note, optionally reordering its blocks
async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateNoteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state
        .db
        .notes
        .update_metadata(id, body.title.as_deref(), body.folder_id)
        .await?;

    if let Some(moves) = body.blocks {
        state.db.blocks.reorder(id, &moves).await?;
    }

    Ok(Json(note))
}

/// Delete a note and its blocks
async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.notes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// BLOCK HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateBlockBody {
    #[serde(rename = "type")]
    kind: String,
    index: i64,
    content: Option<Box<RawValue>>,
}

/// Append a content block to a note
async fn create_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateBlockBody>,
) -> Result<impl IntoResponse, ApiError> {
    // Parsed here rather than in serde so an unknown type tag maps to the
    // same 400 as the rest of the input taxonomy.
    let kind: BlockKind = body.kind.parse()?;
    let block = state
        .db
        .blocks
        .create(id, kind, body.index, body.content.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(block)))
}

#[derive(Debug, Deserialize)]
struct UpdateBlockBody {
    #[serde(rename = "type")]
    kind: String,
    content: Option<Box<RawValue>>,
}

/// Replace a block's content, switching its kind when the payload differs
async fn update_block(
    State(state): State<AppState>,
    Path((id, block_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateBlockBody>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: BlockKind = body.kind.parse()?;
    let block = state
        .db
        .blocks
        .update_content(id, block_id, kind, body.content.as_deref())
        .await?;

    Ok(Json(block))
}

/// Delete a block
async fn delete_block(
    State(state): State<AppState>,
    Path((id, block_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.blocks.delete(id, block_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// IMAGE UPLOAD
// =============================================================================

/// Upload an image asset.
///
/// Accepts multipart form data with an `image` field, stores the file under
/// the data directory, and returns the URL it is served from. Clients embed
/// that URL in an image block's content.
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut stored: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().map(|n| n.to_string());

        if name.as_deref() == Some("image") {
            let filename = field
                .file_name()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "image.bin".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read image data: {}", e)))?;

            if data.is_empty() {
                return Err(ApiError::BadRequest("Image data is empty".to_string()));
            }

            let path = image_storage_path(&filename);
            state.assets.write(&path, &data).await?;

            info!(
                subsystem = "api",
                component = "images",
                op = "upload_image",
                file_size = data.len(),
                storage_path = %path,
                "Image stored"
            );

            stored = Some(path);
        }
    }

    let path = stored.ok_or_else(|| {
        ApiError::BadRequest("Missing 'image' field in multipart data".to_string())
    })?;

    Ok(Json(serde_json::json!({ "url": format!("/{}", path) })))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Internal(carnet_core::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<carnet_core::Error> for ApiError {
    fn from(err: carnet_core::Error) -> Self {
        match &err {
            carnet_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            carnet_core::Error::NoteNotFound(_) => ApiError::NotFound(err.to_string()),
            carnet_core::Error::ParentNotFound(_) | carnet_core::Error::FolderNotFound(_) => {
                ApiError::BadRequest(err.to_string())
            }
            carnet_core::Error::DuplicateName(_) => ApiError::Conflict(err.to_string()),
            carnet_core::Error::InvalidContent(_) | carnet_core::Error::UnsupportedType(_) => {
                ApiError::BadRequest(err.to_string())
            }
            carnet_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

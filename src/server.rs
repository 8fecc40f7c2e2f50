//! Thin HTTP front end.
//!
//! Translates requests into store and pipeline calls and renders the
//! results as JSON; no business logic lives here.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/documents` | List documents (`search`, `limit`, `offset`) |
//! | `GET`    | `/documents/{id}` | A document with its ordered chunks |
//! | `PUT`    | `/documents/{id}` | Rename a document |
//! | `DELETE` | `/documents/{id}` | Delete a document and its chunks |
//! | `POST`   | `/ingest` | Ingest a server-local file or directory |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chunk::ChunkStrategy;
use crate::config::Config;
use crate::db;
use crate::ingest::{self, IngestOutcome};
use crate::models::Document;
use crate::progress::NoReporter;
use crate::store::sqlite::SqliteStore;
use crate::store::{DocumentStore, DocumentUpdate, NameConflict};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
}

/// Starts the HTTP server on the address configured in `[server].bind`.
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    store.migrate().await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/documents", get(handle_list_documents))
        .route(
            "/documents/{id}",
            get(handle_get_document)
                .put(handle_rename_document)
                .delete(handle_delete_document),
        )
        .route("/ingest", post(handle_ingest))
        .layer(cors)
        .with_state(state);

    println!("docshard server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn conflict(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::CONFLICT,
        code: "conflict".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

/// Maps store errors onto the HTTP contract: lost name races become 409s.
fn classify_store_error(err: anyhow::Error) -> AppError {
    if err.downcast_ref::<NameConflict>().is_some() {
        conflict(err.to_string())
    } else {
        internal(err)
    }
}

// ============ Response bodies ============

#[derive(Serialize)]
struct DocumentBody {
    id: String,
    name: String,
    source_path: String,
    format: String,
    size_bytes: i64,
    chunk_count: i64,
    created_at: String,
}

impl DocumentBody {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            source_path: doc.source_path.clone(),
            format: doc.format.as_str().to_string(),
            size_bytes: doc.size_bytes,
            chunk_count: doc.chunk_count,
            created_at: format_ts_iso(doc.created_at),
        }
    }
}

#[derive(Serialize)]
struct ChunkBody {
    index: i64,
    content: String,
    char_count: i64,
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /documents ============

#[derive(Deserialize)]
struct ListParams {
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<DocumentBody>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let docs = state
        .store
        .list_documents(
            params.search.as_deref(),
            params.limit.unwrap_or(50),
            params.offset.unwrap_or(0),
        )
        .await
        .map_err(internal)?;

    Ok(Json(ListResponse {
        documents: docs.iter().map(DocumentBody::from_document).collect(),
    }))
}

// ============ GET /documents/{id} ============

#[derive(Serialize)]
struct DocumentDetailResponse {
    document: DocumentBody,
    chunks: Vec<ChunkBody>,
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentDetailResponse>, AppError> {
    let doc = state
        .store
        .get_document(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("document not found: {}", id)))?;

    let chunks = state.store.get_chunks(&id).await.map_err(internal)?;

    Ok(Json(DocumentDetailResponse {
        document: DocumentBody::from_document(&doc),
        chunks: chunks
            .into_iter()
            .map(|c| ChunkBody {
                index: c.index,
                content: c.content,
                char_count: c.char_count,
            })
            .collect(),
    }))
}

// ============ PUT /documents/{id} ============

#[derive(Deserialize)]
struct RenameRequest {
    name: String,
}

async fn handle_rename_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<DocumentBody>, AppError> {
    if req.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }

    let update = DocumentUpdate {
        name: Some(req.name),
        ..Default::default()
    };
    let found = state
        .store
        .update_document(&id, &update)
        .await
        .map_err(classify_store_error)?;
    if !found {
        return Err(not_found(format!("document not found: {}", id)));
    }

    let doc = state
        .store
        .get_document(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("document not found: {}", id)))?;

    Ok(Json(DocumentBody::from_document(&doc)))
}

// ============ DELETE /documents/{id} ============

#[derive(Serialize)]
struct DeleteResponse {
    deleted: String,
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let found = state.store.delete_document(&id).await.map_err(internal)?;
    if !found {
        return Err(not_found(format!("document not found: {}", id)));
    }
    Ok(Json(DeleteResponse { deleted: id }))
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestRequest {
    path: String,
    strategy: Option<String>,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let strategy = match &req.strategy {
        Some(s) => s
            .parse::<ChunkStrategy>()
            .map_err(|e| bad_request(e.to_string()))?,
        None => state.config.chunking.strategy,
    };

    let target = std::path::PathBuf::from(&req.path);
    if target.is_dir() {
        let report = ingest::run_batch(
            state.store.clone(),
            state.config.clone(),
            Arc::new(NoReporter),
            &target,
            strategy,
        )
        .await
        .map_err(|e| bad_request(e.to_string()))?;

        return Ok(Json(serde_json::json!({
            "succeeded": report.succeeded,
            "failed": report.failed,
            "skipped": report.skipped
        })));
    }

    if !target.is_file() {
        return Err(bad_request(format!("no such file: {}", req.path)));
    }

    let outcome = ingest::ingest_file(
        state.store.as_ref(),
        &state.config,
        &NoReporter,
        &target,
        strategy,
    )
    .await;

    let body = match outcome {
        IngestOutcome::Success {
            document_id,
            chunk_count,
            warnings,
        } => serde_json::json!({
            "status": "success",
            "document_id": document_id,
            "chunk_count": chunk_count,
            "warnings": warnings
        }),
        IngestOutcome::Skipped { reason } => serde_json::json!({
            "status": "skipped",
            "reason": reason
        }),
        IngestOutcome::Failed { error } => serde_json::json!({
            "status": "failed",
            "reason": error.to_string(),
            "policy": error.is_policy()
        }),
    };

    Ok(Json(body))
}

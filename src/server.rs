//! HTTP API for document upload and question answering.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/upload` | Multipart upload (`file` field, `.pdf` or `.txt`) |
//! | `POST` | `/ask` | `{"question": "...", "doc_id": "..."}` → structured answer |
//!
//! When `[server].static_dir` is set, every other path is served from that
//! directory, with `index.html` answering `/`.
//!
//! # Error Contract
//!
//! `/upload` failures use `{"error": "<message>"}` with status 400 for
//! client mistakes and 500 otherwise. `/ask` keeps the answer shape even
//! when failing: `{"answer": "Error processing answer: ..."}` with status
//! 500, and `{"answer": "Please upload a document first!"}` with status 200
//! when nothing has been uploaded. An unknown `doc_id` is a 404 with
//! `{"error": "Document ID not found."}`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser frontend
//! can be served from anywhere.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::{Config, ServerConfig};
use crate::engine::Engine;
use crate::error::DocSageError;
use crate::extract::{extract_text, ExtractError, FileKind};
use crate::store::DocumentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until Ctrl-C, then drops every stored document before returning.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    if config.needs_gemini_key() && crate::config::gemini_api_key().is_none() {
        tracing::error!(
            "{} is not set; Gemini requests will fail until it is provided",
            crate::config::GEMINI_API_KEY_ENV
        );
    }

    let store = Arc::new(DocumentStore::new());
    let engine = Engine::from_config(config, store.clone())?;
    let app = build_router(engine, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "DocSage listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let dropped = store.len();
    store.clear();
    tracing::info!(documents = dropped, "server stopped, document store cleared");
    Ok(())
}

/// Build the application router around an already-assembled engine.
pub fn build_router(engine: Engine, server: &ServerConfig) -> Router {
    let state = AppState {
        engine: Arc::new(engine),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/ask", post(handle_ask));

    if let Some(dir) = &server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

// ============ Error response ============

/// Internal error type that converts into an Axum HTTP response.
///
/// `key` is the JSON field carrying the message: `"error"` for most
/// failures, `"answer"` where the client expects an answer-shaped body.
struct AppError {
    status: StatusCode,
    key: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.to_string(), json!(self.message));
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        key: "error",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        key: "error",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        key: "error",
        message: message.into(),
    }
}

const EMPTY_DOCUMENT: &str = "Document is empty or scanned image.";

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

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    doc_id: String,
    filename: String,
    stats: UploadStats,
}

#[derive(Serialize)]
struct UploadStats {
    chunks: usize,
    process_time_seconds: f64,
}

/// Handler for `POST /upload`.
///
/// Extracts text from the `file` field, then chunks, embeds, and stores
/// it. Extraction runs on the blocking pool since PDF parsing is CPU-bound.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let started = Instant::now();

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| bad_request("No file uploaded"))?;
    if filename.trim().is_empty() {
        return Err(bad_request("Empty filename"));
    }
    FileKind::from_filename(&filename).map_err(|e| bad_request(e.to_string()))?;

    let name = filename.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, &name))
        .await
        .map_err(|e| internal(format!("extraction task failed: {}", e)))?
        .map_err(|e| match e {
            ExtractError::UnsupportedFileType(_) => bad_request(e.to_string()),
            ExtractError::Pdf(_) => internal(e.to_string()),
        })?;

    if text.trim().is_empty() {
        return Err(bad_request(EMPTY_DOCUMENT));
    }

    let report = state.engine.ingest(&text).await.map_err(|e| match e {
        DocSageError::NoExtractableText => bad_request(EMPTY_DOCUMENT),
        other => {
            tracing::error!(filename = %filename, error = %other, "upload failed");
            internal(other.to_string())
        }
    })?;

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        filename = %filename,
        document.id = %report.document_id,
        chunks = report.chunk_count,
        elapsed_secs = elapsed,
        "document uploaded"
    );

    Ok(Json(UploadResponse {
        message: "Document processed successfully".to_string(),
        doc_id: report.document_id,
        filename,
        stats: UploadStats {
            chunks: report.chunk_count,
            process_time_seconds: (elapsed * 100.0).round() / 100.0,
        },
    }))
}

// ============ POST /ask ============

#[derive(Deserialize, Default)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    doc_id: Option<String>,
}

/// Handler for `POST /ask`.
///
/// The body is parsed leniently: anything that is not a JSON object with
/// a non-blank `question` is answered with 400 `Missing question`.
async fn handle_ask(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: AskRequest = serde_json::from_slice(&body).unwrap_or_default();
    let question = request
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| bad_request("Missing question"))?;

    match state
        .engine
        .answer(request.doc_id.as_deref(), question)
        .await
    {
        Ok(answer) => Ok(Json(answer).into_response()),
        Err(e @ DocSageError::NoDocuments) => {
            Ok(Json(json!({ "answer": e.to_string() })).into_response())
        }
        Err(e @ DocSageError::DocumentNotFound(_)) => Err(not_found(e.to_string())),
        Err(e) => {
            tracing::error!(error = %e, "answering failed");
            Err(AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                key: "answer",
                message: format!("Error processing answer: {}", e),
            })
        }
    }
}

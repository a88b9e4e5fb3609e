//! JSON HTTP API.
//!
//! Exposes the knowledge base, question answering, chat, export, and
//! analysis over HTTP for browser front-ends and scripts.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/documents` | List stored documents |
//! | `DELETE` | `/documents/{id}` | Delete one document |
//! | `GET`    | `/documents/{id}/analysis` | Sentiment, keywords, and stats |
//! | `POST`   | `/reset` | Delete every document and session |
//! | `POST`   | `/upload` | Multipart file upload and ingestion |
//! | `GET`    | `/files/{name}` | Download a previously uploaded file |
//! | `POST`   | `/fetch_url` | Fetch and ingest a web page |
//! | `POST`   | `/ask` | Answer a question from retrieved context |
//! | `POST`   | `/export` | Download the session's last answer as CSV, XLSX, or DOCX |
//! | `POST`   | `/chat/send` | One conversational turn |
//! | `POST`   | `/chat/clear` | Reset a session's chat history |
//! | `GET`    | `/chat/history` | A session's chat history |
//! | `POST`   | `/summarize` | Summarize documents that have no summary yet |
//! | `GET`    | `/visualize` | Per-document length overview |
//!
//! Requests that touch conversation state accept an optional `session_id`
//! (default `"default"`).
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Empty message." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `payload_too_large` (413), `fetch_failed` (502), `internal` (500).
//!
//! Upload bodies are limited by `[ingest].max_upload_bytes` (default 50 MiB).
//!
//! LLM failures are not HTTP errors: the answer text carries
//! `"Error calling LLM: ..."` and the status stays 200.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use ragdesk_core::analysis::{Analysis, DocumentOverview};
use ragdesk_core::models::ConversationTurn;
use ragdesk_core::qa::DocumentSummary;
use ragdesk_core::Session;

use crate::app::App;
use crate::config::Config;
use crate::export::{export, ExportFormat, MIME_DOCX};
use crate::ingest::{sanitize_filename, IngestError, Ingested};

pub const DEFAULT_SESSION: &str = "default";

/// One conversation, locked independently of every other session.
pub type SharedSession = Arc<Mutex<Session>>;

/// Conversation state keyed by session id.
///
/// The map lock is only held to look a session up; model calls run under
/// the per-session lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, SharedSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `id`, created empty on first use.
    pub fn session(&mut self, id: &str) -> SharedSession {
        self.sessions.entry(id.to_string()).or_default().clone()
    }

    pub fn peek(&self, id: &str) -> Option<SharedSession> {
        self.sessions.get(id).cloned()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    app: App,
    sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    pub fn new(app: App) -> Self {
        Self {
            app,
            sessions: Arc::new(Mutex::new(SessionStore::new())),
        }
    }

    async fn session(&self, session_id: Option<&str>) -> SharedSession {
        self.sessions.lock().await.session(session_key(session_id))
    }

    async fn peek_session(&self, session_id: Option<&str>) -> Option<SharedSession> {
        self.sessions.lock().await.peek(session_key(session_id))
    }
}

fn session_key(session_id: Option<&str>) -> &str {
    session_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
}

/// Build the router with every endpoint and a permissive CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let upload_limit = state.app.config.ingest.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", get(handle_list_documents))
        .route("/documents/{id}", delete(handle_delete_document))
        .route("/documents/{id}/analysis", get(handle_analysis))
        .route("/reset", post(handle_reset))
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/{name}", get(handle_file))
        .route("/fetch_url", post(handle_fetch_url))
        .route("/ask", post(handle_ask))
        .route("/export", post(handle_export))
        .route("/chat/send", post(handle_chat_send))
        .route("/chat/clear", post(handle_chat_clear))
        .route("/chat/history", get(handle_chat_history))
        .route("/summarize", post(handle_summarize))
        .route("/visualize", get(handle_visualize))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = App::open(config).await?;
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        llm = app.engine.llm().name(),
        "server listening"
    );
    println!("ragdesk listening on http://{}", bind_addr);

    axum::serve(listener, router(AppState::new(app))).await?;
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

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: "payload_too_large",
            message: format!("Upload exceeds the size limit: {}", err.body_text()),
        };
    }
    bad_request(format!("Failed to read multipart field: {}", err.body_text()))
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Fetch { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "fetch_failed",
                message: err.to_string(),
            },
            IngestError::Read { .. } | IngestError::Extract(_) => bad_request(err.to_string()),
            IngestError::Store(_) => internal(anyhow::Error::new(err)),
        }
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

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

// ============ Documents ============

#[derive(Debug, Serialize)]
pub struct DocumentEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub source_type: String,
    pub path_or_url: String,
    pub chars: usize,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentEntry>,
}

async fn handle_list_documents(State(state): State<AppState>) -> ApiResult<DocumentsResponse> {
    let docs = state.app.store.list().await.map_err(internal)?;
    let documents = docs
        .into_iter()
        .map(|d| DocumentEntry {
            id: d.id,
            source_type: d.source_type.to_string(),
            chars: d.raw_text.chars().count(),
            path_or_url: d.path_or_url,
            summary: d.summary,
        })
        .collect();
    Ok(Json(DocumentsResponse { documents }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: i64,
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DeleteResponse> {
    if !state.app.store.delete(id).await.map_err(internal)? {
        return Err(not_found(format!("document not found: {}", id)));
    }
    tracing::info!(id, "document deleted");
    Ok(Json(DeleteResponse { deleted: id }))
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub removed: u64,
}

async fn handle_reset(State(state): State<AppState>) -> ApiResult<ResetResponse> {
    let removed = state.app.store.clear().await.map_err(internal)?;
    state.sessions.lock().await.clear();
    tracing::info!(removed, "knowledge base reset");
    Ok(Json(ResetResponse { removed }))
}

async fn handle_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Analysis> {
    state
        .app
        .engine
        .analyze(id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found(format!("document not found: {}", id)))
}

#[derive(Debug, Serialize)]
pub struct VisualizeResponse {
    pub documents: Vec<DocumentOverview>,
}

async fn handle_visualize(State(state): State<AppState>) -> ApiResult<VisualizeResponse> {
    let documents = state.app.engine.overview().await.map_err(internal)?;
    Ok(Json(VisualizeResponse { documents }))
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summaries: Vec<DocumentSummary>,
}

async fn handle_summarize(State(state): State<AppState>) -> ApiResult<SummarizeResponse> {
    let summaries = state.app.engine.summarize_all().await.map_err(internal)?;
    Ok(Json(SummarizeResponse { summaries }))
}

// ============ Ingestion ============

#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ingested: Vec<Ingested>,
    pub errors: Vec<UploadFailure>,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut ingested = Vec::new();
    let mut errors = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await.map_err(multipart_error)?;

        tracing::info!(file = %filename, bytes = data.len(), "upload received");
        match state.app.ingestor.ingest_upload(&filename, &data).await {
            Ok(doc) => ingested.push(doc),
            Err(e) => {
                tracing::warn!(file = %filename, error = %e, "upload not ingested");
                errors.push(UploadFailure {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    if ingested.is_empty() && errors.is_empty() {
        return Err(bad_request("No file uploaded."));
    }
    Ok(Json(UploadResponse { ingested, errors }))
}

fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") | Some("md") => "text/plain; charset=utf-8",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("pdf") => "application/pdf",
        Some("docx") => MIME_DOCX,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Serve a file from the upload directory. Names that carry any path
/// component are treated as missing.
async fn handle_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let missing = || not_found(format!("file not found: {}", name));
    if sanitize_filename(&name) != name {
        return Err(missing());
    }

    let path = state.app.config.ingest.upload_dir.join(&name);
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(missing());
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| internal(anyhow::Error::new(e).context(format!("reading {}", path.display()))))?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes).into_response())
}

#[derive(Debug, Deserialize)]
pub struct FetchUrlRequest {
    #[serde(default)]
    pub url: String,
}

async fn handle_fetch_url(
    State(state): State<AppState>,
    Json(req): Json<FetchUrlRequest>,
) -> ApiResult<Ingested> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(bad_request("url must not be empty"));
    }
    Ok(Json(state.app.ingestor.ingest_url(url).await?))
}

// ============ POST /ask, /export ============

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    pub top_k: Option<usize>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub chunks: Vec<String>,
}

fn top_k_or_default(state: &AppState, top_k: Option<usize>) -> Result<usize, AppError> {
    match top_k {
        Some(0) => Err(bad_request("top_k must be at least 1")),
        Some(k) => Ok(k),
        None => Ok(state.app.engine.options().top_k),
    }
}

async fn handle_ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> ApiResult<AskResponse> {
    let top_k = top_k_or_default(&state, req.top_k)?;
    let session = state.session(req.session_id.as_deref()).await;
    let mut session = session.lock().await;

    let exchange = state
        .app
        .engine
        .answer(&mut session, &req.question, top_k)
        .await
        .map_err(internal)?;

    Ok(Json(AskResponse {
        chunks: exchange.chunk_texts(),
        answer: exchange.answer,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub session_id: Option<String>,
}

async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let exchange = match state.peek_session(req.session_id.as_deref()).await {
        Some(session) => {
            let session = session.lock().await;
            session
                .last_exchange()
                .filter(|ex| !ex.rows.is_empty())
                .cloned()
        }
        None => None,
    };
    let Some(exchange) = exchange else {
        return Err(bad_request("No data to export."));
    };

    let bytes = export(req.format, &exchange.rows, &exchange.question, &exchange.answer)
        .map_err(internal)?;

    let headers = [
        (header::CONTENT_TYPE, req.format.mime_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", req.format.file_name()),
        ),
    ];
    Ok((headers, bytes).into_response())
}

// ============ Chat ============

#[derive(Debug, Deserialize)]
pub struct ChatSendRequest {
    #[serde(default)]
    pub message: String,
    pub top_k: Option<usize>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatSendResponse {
    pub reply: String,
    pub history: Vec<ConversationTurn>,
}

async fn handle_chat_send(
    State(state): State<AppState>,
    Json(req): Json<ChatSendRequest>,
) -> ApiResult<ChatSendResponse> {
    if req.message.trim().is_empty() {
        return Err(bad_request("Empty message."));
    }
    let top_k = top_k_or_default(&state, req.top_k)?;

    let session = state.session(req.session_id.as_deref()).await;
    let mut session = session.lock().await;
    let reply = state
        .app
        .engine
        .chat(&mut session, &req.message, top_k)
        .await
        .map_err(internal)?;

    Ok(Json(ChatSendResponse {
        reply,
        history: session.history().to_vec(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ConversationTurn>,
}

/// The body is optional; an empty body clears the default session.
async fn handle_chat_clear(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> ApiResult<HistoryResponse> {
    let req: SessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| bad_request(format!("Invalid JSON body: {}", e)))?
    };
    let session = state.session(req.session_id.as_deref()).await;
    session.lock().await.clear_history();
    Ok(Json(HistoryResponse {
        history: Vec::new(),
    }))
}

async fn handle_chat_history(
    State(state): State<AppState>,
    Query(req): Query<SessionRequest>,
) -> ApiResult<HistoryResponse> {
    let history = match state.peek_session(req.session_id.as_deref()).await {
        Some(session) => {
            let session = session.lock().await;
            session.history().to_vec()
        }
        None => Vec::new(),
    };
    Ok(Json(HistoryResponse { history }))
}

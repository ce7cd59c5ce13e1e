//! HTTP transport for the encrypt/decrypt engine.
//!
//! Endpoints:
//!   POST   /encrypt   - multipart `file`, `password`, optional `output_path`
//!   POST   /decrypt   - same fields; responds with the restored file
//!   GET    /history   - text log, `?recent=N` for the last N lines
//!   DELETE /history   - clear the log
//!
//! Each request works in its own scratch directory under `upload_dir`, removed
//! once the response body has been read. Client-supplied names are reduced to
//! their final path component before use.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lockbox_core::config::DaemonConfig;
use lockbox_core::{Engine, LockboxError};
use prometheus_client::registry::Registry;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::metrics::{healthz_handler, metrics_handler, OperationMetrics};

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub upload_dir: Arc<PathBuf>,
    pub metrics: OperationMetrics,
    pub registry: Arc<Registry>,
}

pub fn router(state: AppState, config: &DaemonConfig) -> Router {
    let limit = usize::try_from(config.max_upload_mb.saturating_mul(1024 * 1024))
        .unwrap_or(usize::MAX);

    let mut app = Router::new()
        .route("/encrypt", post(encrypt_handler))
        .route("/decrypt", post(decrypt_handler))
        .route("/history", get(history_handler).delete(clear_history_handler))
        .route("/healthz", get(healthz_handler));
    if config.metrics {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.layer(DefaultBodyLimit::max(limit)).with_state(state)
}

/// Serve `app` on `addr` until ctrl-c.
pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("bind {addr}: {e}"))?;

    info!(addr = %addr, "lockboxd: listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!("http server: {e}"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing file or password")]
    MissingFields,

    #[error("Decryption failed, incorrect password or corrupted file")]
    BadContainer,

    #[error("{0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields | ApiError::BadContainer => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_decrypt(e: LockboxError) -> Self {
        if e.is_bad_container() {
            ApiError::BadContainer
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl From<LockboxError> for ApiError {
    fn from(e: LockboxError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        let message = match &self {
            ApiError::Multipart(e) => e.body_text(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// ── Uploads ───────────────────────────────────────────────────────────────────

/// One request's files. Everything lives in a private scratch directory under
/// `upload_dir` that is removed when the `Upload` drops.
struct Upload {
    scratch: TempDir,
    input: PathBuf,
    password: SecretString,
    output: Option<PathBuf>,
}

/// Result file read back into memory before the scratch directory goes away.
struct Produced {
    filename: String,
    body: Vec<u8>,
}

/// Read the multipart form and store the uploaded file in a fresh scratch
/// directory under `upload_dir`.
async fn receive_upload(
    upload_dir: &Path,
    mut multipart: Multipart,
) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut password: Option<SecretString> = None;
    let mut output_path: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await?;
                file = Some((filename, data));
            }
            Some("password") => password = Some(SecretString::from(field.text().await?)),
            Some("output_path") => output_path = Some(field.text().await?),
            _ => {}
        }
    }

    let password = password.filter(|p| !p.expose_secret().is_empty());
    let (Some((filename, data)), Some(password)) = (file, password) else {
        return Err(ApiError::MissingFields);
    };
    let filename = safe_file_name(&filename).ok_or(ApiError::MissingFields)?;

    tokio::fs::create_dir_all(upload_dir).await?;
    let scratch = tempfile::Builder::new()
        .prefix("req-")
        .tempdir_in(upload_dir)?;
    let input = scratch.path().join(&filename);
    tokio::fs::write(&input, &data).await?;
    debug!(
        file = %filename,
        bytes = data.len(),
        scratch = %scratch.path().display(),
        "upload stored"
    );

    let output = output_path
        .as_deref()
        .and_then(safe_file_name)
        .map(|name| scratch.path().join(name));

    Ok(Upload {
        scratch,
        input,
        password,
        output,
    })
}

/// Final path component of a client-supplied name, or `None` when nothing
/// usable remains.
pub fn safe_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        n if n.contains('\0') => None,
        n => Some(n.to_string()),
    }
}

fn read_produced(path: &Path) -> std::io::Result<Produced> {
    let body = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', "_"))
        .unwrap_or_default();
    Ok(Produced { filename, body })
}

fn attachment(produced: Produced) -> Response {
    let disposition =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", produced.filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        produced.body,
    )
        .into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn encrypt_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = receive_upload(&state.upload_dir, multipart).await?;

    let engine = state.engine.clone();
    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || {
        let Upload {
            scratch,
            input,
            password,
            output,
        } = upload;
        let produced = engine
            .encrypt(&input, output.as_deref(), password)
            .and_then(|path| read_produced(&path).map_err(LockboxError::from));
        drop(scratch);
        produced
    })
    .await?;
    state.metrics.record("encrypt", result.is_ok(), started.elapsed());

    Ok(attachment(result?))
}

async fn decrypt_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = receive_upload(&state.upload_dir, multipart).await?;

    let engine = state.engine.clone();
    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || {
        let Upload {
            scratch,
            input,
            password,
            output,
        } = upload;
        let produced = engine
            .decrypt(&input, output.as_deref(), password)
            .and_then(|path| read_produced(&path).map_err(LockboxError::from));
        drop(scratch);
        produced
    })
    .await?;
    state.metrics.record("decrypt", result.is_ok(), started.elapsed());

    Ok(attachment(result.map_err(ApiError::from_decrypt)?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    recent: Option<usize>,
}

async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<String, ApiError> {
    let history = state.engine.history().clone();
    let text = tokio::task::spawn_blocking(move || match query.recent {
        Some(n) => history.read_recent(n),
        None => history.read_all(),
    })
    .await??;
    Ok(text)
}

async fn clear_history_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    let history = state.engine.history().clone();
    tokio::task::spawn_blocking(move || history.clear()).await??;
    info!("history cleared");
    Ok("History cleared.".to_string())
}

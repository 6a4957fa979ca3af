//! Axum HTTP routes for the ingestion workflow.

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::catalog::ExportFormat;
use crate::config::ServiceConfig;
use crate::domain::{FileList, FileSummary, SaveDataRequest, SaveDataResponse, UploadResponse};
use crate::engine::IngestEngine;
use crate::error::ServiceError;
use crate::upload;

pub struct AppState {
    pub engine: IngestEngine,
}

/// Routes are served both at the root and under `/api`.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/save-data", post(save_data))
        .route("/files", get(list_files))
        .route("/preview", get(preview))
        .route("/download", get(download))
        .route("/upload", post(upload_file));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ServiceError> {
    state.engine.health_check().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "tabular-ingest-service",
    })))
}

fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.to_string()))
}

async fn save_data(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(body) = body.map_err(|e| ServiceError::validation(e.body_text()))?;
    let request = SaveDataRequest::from_json(body)?;
    info!(
        "Received save-data request for table '{}' with {} rows",
        request.table_name,
        request.data.len()
    );

    let client = client_address(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let report = state.engine.save_data(&request, client.as_deref()).await?;

    Ok(Json(SaveDataResponse::from(&report)))
}

async fn list_files(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ServiceError> {
    let files = state.engine.list_files().await?;
    Ok(Json(FileList {
        files: files.into_iter().map(FileSummary::from).collect(),
    }))
}

#[derive(Deserialize)]
struct PreviewParams {
    table: Option<String>,
}

async fn preview(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PreviewParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let table = params
        .table
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::validation("Missing table parameter"))?;

    Ok(Json(state.engine.preview(&table).await?))
}

#[derive(Deserialize)]
struct DownloadParams {
    file: Option<String>,
    format: Option<String>,
}

/// Bytes outside RFC 5987 `attr-char`.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `Content-Disposition` with an ASCII fallback name and an RFC 5987 UTF-8 name.
fn content_disposition(file_name: &str) -> Result<HeaderValue, ServiceError> {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(file_name, ATTR_CHAR)
    ))
    .map_err(|e| ServiceError::Export {
        message: format!("Invalid attachment name: {}", e),
    })
}

async fn download(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ServiceError> {
    let (Some(file), Some(format)) = (
        params.file.filter(|f| !f.is_empty()),
        params.format.filter(|f| !f.is_empty()),
    ) else {
        return Err(ServiceError::validation("Missing file or format parameter"));
    };
    let format: ExportFormat = format.parse()?;

    let exported = state.engine.export(&file, format).await?;
    info!(
        "Sending {} ({} bytes)",
        exported.attachment_name,
        exported.bytes.len()
    );

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(exported.format.content_type()),
        ),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&exported.attachment_name)?,
        ),
    ];
    Ok((headers, exported.bytes).into_response())
}

async fn upload_file(mut multipart: Multipart) -> Result<impl IntoResponse, ServiceError> {
    let upload_error = |e: axum::extract::multipart::MultipartError| ServiceError::Upload {
        message: e.body_text(),
    };

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(upload_error)?.to_vec();

        let sheet = tokio::task::spawn_blocking(move || upload::parse_upload(&file_name, bytes))
            .await
            .map_err(|e| ServiceError::Upload {
                message: format!("Parser task failed: {}", e),
            })??;

        return Ok(Json(UploadResponse::from(sheet)));
    }

    Err(ServiceError::Upload {
        message: "No file uploaded".to_string(),
    })
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(config: &ServiceConfig, engine: IngestEngine) -> Result<(), ServiceError> {
    let state = Arc::new(AppState { engine });
    let router = build_router(state, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, gracefully shutting down..."),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }
}

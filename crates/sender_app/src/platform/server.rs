use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use sender_core::Notification;
use sender_engine::{
    has_supported_extension, load_sheet, preview_rows, template_csv, upload_filename,
    AtomicFileWriter, SheetData, SheetError, TEMPLATE_FILENAME,
};
use sender_logging::{sender_error, sender_info, sender_warn};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use super::app::Controller;
use super::{ui, ws};

/// State shared by every route.
pub struct AppContext {
    pub controller: Arc<Controller>,
    pub notifications: broadcast::Sender<Notification>,
    pub uploads: AtomicFileWriter,
    pub max_upload_bytes: usize,
}

pub fn router(context: Arc<AppContext>) -> Router {
    let body_limit = DefaultBodyLimit::max(context.max_upload_bytes);
    Router::new()
        .route("/", get(ui::index))
        .route("/upload", post(upload))
        .route("/download-template", get(download_template))
        .route("/ws", get(ws::ws_handler))
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/last-run", get(last_run))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .with_state(context)
}

#[derive(Debug, Error)]
enum UploadError {
    #[error("No file uploaded")]
    NoFile,
    #[error("No file selected")]
    NoFilename,
    #[error("Only spreadsheet files (.xlsx, .xls, .xlsm, .ods, .csv) are allowed")]
    UnsupportedType,
    #[error("File too large. Maximum size is {0}MB")]
    TooLarge(usize),
    #[error("{0}")]
    Sheet(#[from] SheetError),
    #[error("Error: {0}")]
    Internal(String),
}

impl UploadError {
    fn status(&self) -> StatusCode {
        match self {
            // An unreadable sheet is a bad upload, not a server fault.
            UploadError::NoFile
            | UploadError::NoFilename
            | UploadError::UnsupportedType
            | UploadError::Sheet(_) => StatusCode::BAD_REQUEST,
            UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            sender_error!("Upload error: {}", self);
        } else {
            sender_warn!("Upload rejected: {}", self);
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

async fn upload(
    State(context): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, UploadError> {
    sender_info!("Upload request received");
    let limit_mb = context.max_upload_bytes / (1024 * 1024);
    let multipart_error = |err: MultipartError| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge(limit_mb)
        } else {
            UploadError::Internal(err.body_text())
        }
    };

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or(UploadError::NoFile)?;
    if filename.is_empty() {
        return Err(UploadError::NoFilename);
    }
    if !has_supported_extension(&filename) {
        return Err(UploadError::UnsupportedType);
    }

    let stored_name = upload_filename(&Local::now().format("%Y%m%d_%H%M%S").to_string(), &filename);
    let writer = context.uploads.clone();
    let (path, sheet) = tokio::task::spawn_blocking(move || store_upload(&writer, &stored_name, &data))
        .await
        .map_err(|err| UploadError::Internal(err.to_string()))??;

    sender_info!("Upload successful: {} rows in {:?}", sheet.len(), path);
    Ok(Json(upload_summary(&path, &filename, &sheet)))
}

/// Saves the upload, then rejects (and removes) it if it is not a usable sheet.
fn store_upload(
    writer: &AtomicFileWriter,
    stored_name: &str,
    data: &[u8],
) -> Result<(PathBuf, SheetData), UploadError> {
    let path = writer
        .write(stored_name, data)
        .map_err(|err| UploadError::Internal(err.to_string()))?;

    let checked = load_sheet(&path).and_then(|sheet| {
        let missing = sheet.missing_required();
        if missing.is_empty() {
            Ok(sheet)
        } else {
            Err(SheetError::MissingColumns(missing))
        }
    });
    match checked {
        Ok(sheet) => Ok((path, sheet)),
        Err(err) => {
            if let Err(remove_err) = std::fs::remove_file(&path) {
                sender_warn!("Could not remove rejected upload {:?}: {}", path, remove_err);
            }
            Err(err.into())
        }
    }
}

fn upload_summary(path: &std::path::Path, filename: &str, sheet: &SheetData) -> Value {
    let preview: Vec<Value> = preview_rows(sheet)
        .into_iter()
        .map(|row| {
            let cells: Map<String, Value> = sheet
                .columns()
                .iter()
                .cloned()
                .zip(row.into_iter().map(Value::String))
                .collect();
            Value::Object(cells)
        })
        .collect();

    json!({
        "success": true,
        "filepath": path.display().to_string(),
        "filename": filename,
        "total_rows": sheet.len(),
        "columns": sheet.columns(),
        "preview": preview,
    })
}

async fn download_template() -> Response {
    match template_csv() {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{TEMPLATE_FILENAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => {
            sender_error!("Template download error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(context): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!(context.controller.view()))
}

async fn last_run(State(context): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!(context.controller.view().last_result))
}

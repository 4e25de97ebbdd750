use std::path::PathBuf;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::letter::record::LetterRecord;
use crate::render::{output_filename, write_letter, DOCX_MIME_TYPE};
use crate::routes::endpoint_listing;
use crate::state::AppState;

pub const ENDPOINTS: [(&str, &str); 2] = [
    ("/generate", "POST - Generate cover letter DOCX file"),
    ("/health", "GET - Health check"),
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/generate", post(handle_generate))
}

/// GET /api/cover/
pub async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "Cover Letter Generator API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoint_listing("", &ENDPOINTS),
    }))
}

/// GET /api/cover/health
pub async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Cover letter generator is running"
    }))
}

/// POST /api/cover/generate
/// Body is a letter record; the response is the rendered .docx.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let record = LetterRecord::from_value(&body)
        .map_err(|e| AppError::Validation(format!("Invalid cover letter data: {e}")))?;
    docx_download(record, state.config.output_dir.clone()).await
}

/// Renders and saves the letter off the async runtime and returns it as an attachment.
/// The response headers are settled before anything is written to `dir`.
pub async fn docx_download(record: LetterRecord, dir: PathBuf) -> Result<Response, AppError> {
    let filename = output_filename(&record);
    let disposition = content_disposition(&filename)?;

    let letter = tokio::task::spawn_blocking(move || write_letter(&record, filename, &dir))
        .await
        .context("Render task panicked")??;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        letter.bytes,
    )
        .into_response())
}

fn content_disposition(filename: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_bytes(format!("attachment; filename={filename}").as_bytes())
        .map_err(|e| AppError::Validation(format!("Invalid output file name {filename:?}: {e}")))
}

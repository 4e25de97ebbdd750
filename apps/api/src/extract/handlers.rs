use axum::{
    extract::Multipart,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extract::upload::{extract_upload, single_file, UploadedFile};
use crate::extract::{ExtractError, ExtractedDocument, FileType, PageText};
use crate::routes::endpoint_listing;
use crate::state::AppState;

pub const ENDPOINTS: [(&str, &str); 4] = [
    ("/extract", "POST - Extract text from uploaded file (simple response)"),
    ("/extract-detailed", "POST - Extract text with detailed structure"),
    ("/extract-text-only", "POST - Extract only the plain text"),
    ("/health", "GET - Health check endpoint"),
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/extract", post(handle_extract))
        .route("/extract-detailed", post(handle_extract_detailed))
        .route("/extract-text-only", post(handle_extract_text_only))
}

#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub success: bool,
    pub filename: String,
    pub full_text: Option<String>,
    pub word_count: Option<usize>,
    pub character_count: Option<usize>,
    pub file_type: Option<FileType>,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DetailedExtractionResponse {
    pub success: bool,
    pub filename: String,
    pub full_text: Option<String>,
    pub pages: Option<Vec<PageText>>,
    pub paragraphs: Option<Vec<String>>,
    pub tables: Option<Vec<Vec<Vec<String>>>>,
    pub metadata: Option<Map<String, Value>>,
    pub word_count: Option<usize>,
    pub character_count: Option<usize>,
    pub error_message: Option<String>,
}

/// GET /api/extract/
pub async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "Text Extractor API",
        "version": env!("CARGO_PKG_VERSION"),
        "supported_formats": [FileType::Pdf.as_str(), FileType::Docx.as_str()],
        "endpoints": endpoint_listing("", &ENDPOINTS),
    }))
}

/// GET /api/extract/health
pub async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Text extractor API is running"
    }))
}

/// POST /api/extract/extract
pub async fn handle_extract(mut multipart: Multipart) -> Result<Json<ExtractionResponse>, AppError> {
    let upload = accepted_upload(&mut multipart).await?;
    let filename = upload.filename.clone();

    let response = match extract_upload(&upload).await?.inspect_err(|e| log_failure(&upload, e)) {
        Ok(doc) => ExtractionResponse {
            success: true,
            filename,
            full_text: Some(doc.full_text),
            word_count: Some(doc.word_count),
            character_count: Some(doc.character_count),
            file_type: Some(doc.file_type),
            error_message: None,
        },
        Err(e) => ExtractionResponse {
            success: false,
            filename,
            full_text: None,
            word_count: None,
            character_count: None,
            file_type: None,
            error_message: Some(e.to_string()),
        },
    };
    Ok(Json(response))
}

/// POST /api/extract/extract-detailed
pub async fn handle_extract_detailed(
    mut multipart: Multipart,
) -> Result<Json<DetailedExtractionResponse>, AppError> {
    let upload = accepted_upload(&mut multipart).await?;
    let filename = upload.filename.clone();

    let response = match extract_upload(&upload).await?.inspect_err(|e| log_failure(&upload, e)) {
        Ok(ExtractedDocument {
            full_text,
            word_count,
            character_count,
            pages,
            paragraphs,
            tables,
            metadata,
            ..
        }) => DetailedExtractionResponse {
            success: true,
            filename,
            full_text: Some(full_text),
            pages,
            paragraphs,
            tables,
            metadata: Some(metadata),
            word_count: Some(word_count),
            character_count: Some(character_count),
            error_message: None,
        },
        Err(e) => DetailedExtractionResponse {
            success: false,
            filename,
            full_text: None,
            pages: None,
            paragraphs: None,
            tables: None,
            metadata: None,
            word_count: None,
            character_count: None,
            error_message: Some(e.to_string()),
        },
    };
    Ok(Json(response))
}

/// POST /api/extract/extract-text-only
/// Extraction failures are a 400 here rather than a `success: false` body.
pub async fn handle_extract_text_only(mut multipart: Multipart) -> Result<Json<Value>, AppError> {
    let upload = accepted_upload(&mut multipart).await?;
    let doc = extract_upload(&upload).await?.inspect_err(|e| log_failure(&upload, e))?;
    Ok(Json(json!({ "text": doc.full_text })))
}

/// Reads the `file` part and rejects unsupported extensions before any staging happens.
async fn accepted_upload(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    let upload = single_file(multipart).await?;
    let file_type = FileType::from_extension(&upload.extension())?;
    info!(
        filename = %upload.filename,
        file_type = file_type.as_str(),
        bytes = upload.bytes.len(),
        "Extracting text from upload"
    );
    Ok(upload)
}

fn log_failure(upload: &UploadedFile, e: &ExtractError) {
    warn!(filename = %upload.filename, "Extraction failed: {e}");
}

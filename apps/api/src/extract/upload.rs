use std::path::Path;

use anyhow::Context;
use axum::extract::multipart::{Field, Multipart};
use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;
use crate::extract::{extract, ExtractError, ExtractedDocument};

/// A file part read fully into memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Lowercased suffix including the dot (`".pdf"`), or `""` when the name has none.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

/// Reads one file part. `default_name` stands in when the client sent no filename.
pub async fn read_file(field: Field<'_>, default_name: &str) -> Result<UploadedFile, AppError> {
    let filename = field
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or(default_name)
        .to_string();
    let bytes = field.bytes().await?;
    debug!(filename = %filename, bytes = bytes.len(), "File upload received");
    Ok(UploadedFile { filename, bytes })
}

/// Reads the `file` part used by the extraction endpoints.
pub async fn single_file(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if field.file_name().map_or(true, str::is_empty) {
            return Err(AppError::Validation("No filename provided".to_string()));
        }
        return read_file(field, "").await;
    }
    Err(AppError::Validation("No file uploaded".to_string()))
}

/// Runs the extractor on the in-memory upload off the async runtime.
///
/// The outer error is a join failure; the inner result is the extraction outcome.
pub async fn extract_upload(
    upload: &UploadedFile,
) -> anyhow::Result<Result<ExtractedDocument, ExtractError>> {
    let extension = upload.extension();
    let bytes = upload.bytes.clone();

    tokio::task::spawn_blocking(move || extract(&bytes, &extension))
        .await
        .context("Extraction task panicked")
}

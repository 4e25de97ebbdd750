// Document Text Extractor
// Converts uploaded PDF and DOCX bytes into plain text plus structural metadata.
// Parsing is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod docx;
pub mod handlers;
pub mod pdf;
pub mod upload;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}. Supported types: .pdf, .docx")]
    UnsupportedFormat(String),

    #[error("{0}")]
    ExtractionFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "DOCX")]
    Docx,
}

impl FileType {
    /// Accepts `pdf`, `.PDF`, `docx`, `.Docx`, …
    pub fn from_extension(extension: &str) -> Result<Self, ExtractError> {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" => Ok(FileType::Pdf),
            "docx" => Ok(FileType::Docx),
            _ => Err(ExtractError::UnsupportedFormat(format!(".{normalized}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "PDF",
            FileType::Docx => "DOCX",
        }
    }
}

/// One PDF page's text (1-based page number).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// Text and structure pulled out of one document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub file_type: FileType,
    pub full_text: String,
    pub word_count: usize,
    pub character_count: usize,
    /// PDF only.
    pub pages: Option<Vec<PageText>>,
    /// DOCX only.
    pub paragraphs: Option<Vec<String>>,
    /// DOCX only: table → row → cell text.
    pub tables: Option<Vec<Vec<Vec<String>>>>,
    pub metadata: Map<String, Value>,
}

impl ExtractedDocument {
    /// Strips the accumulated text and derives the counts from the stripped form.
    fn new(file_type: FileType, accumulated: &str, metadata: Map<String, Value>) -> Self {
        let full_text = accumulated.trim().to_string();
        Self {
            file_type,
            word_count: full_text.split_whitespace().count(),
            character_count: full_text.chars().count(),
            full_text,
            pages: None,
            paragraphs: None,
            tables: None,
            metadata,
        }
    }
}

/// Extracts text from a document, choosing the parser by declared extension.
pub fn extract(bytes: &[u8], declared_extension: &str) -> Result<ExtractedDocument, ExtractError> {
    match FileType::from_extension(declared_extension)? {
        FileType::Pdf => pdf::extract_pdf(bytes),
        FileType::Docx => docx::extract_docx(bytes),
    }
}

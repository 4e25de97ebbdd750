// Cover Letter Renderer
// Lays a validated LetterRecord out as an ordered list of paragraphs and packages
// them as a .docx file.

pub mod docx_writer;
pub mod handlers;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::letter::record::{sanitize_file_name, LetterRecord};

pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CLOSING_LINE: &str = "Thank you for considering my application.";
const SIGN_OFF: &str = "Sincerely,";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    Xml(String),
}

/// A letter written to disk.
#[derive(Debug)]
pub struct RenderedLetter {
    pub filename: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// `March 05, 2025`
pub fn letter_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Paragraph sequence of the letter. An empty string is a blank line.
pub fn letter_blocks(record: &LetterRecord, date: &str) -> Vec<String> {
    let mut blocks = vec![
        record.your_name().to_string(),
        record.your_address().to_string(),
        format!("Email: {}", record.your_email()),
        format!("Phone: {}", record.your_phone()),
        String::new(),
        date.to_string(),
        String::new(),
        record.employer_name().to_string(),
        record.company_name().to_string(),
        record.company_address().to_string(),
        String::new(),
        format!("Dear {},", record.employer_name()),
        String::new(),
    ];
    for paragraph in record.body_paragraphs() {
        blocks.push(paragraph.clone());
        blocks.push(String::new());
    }
    blocks.extend([
        CLOSING_LINE.to_string(),
        String::new(),
        SIGN_OFF.to_string(),
        record.your_name().to_string(),
    ]);
    blocks
}

pub fn render_docx(record: &LetterRecord, date: &str) -> Result<Vec<u8>, RenderError> {
    let blocks = letter_blocks(record, date);
    let title = format!("Cover Letter - {}", record.position_title());
    docx_writer::write_docx(&blocks, &title, record.your_name())
}

/// The record's `file_name`, or `cover_letter_{company}_{position}_{8 hex}.docx`,
/// with spaces and path separators replaced by underscores and control characters dropped.
pub fn output_filename(record: &LetterRecord) -> String {
    let name = match record.file_name() {
        Some(name) => sanitize_file_name(name),
        None => {
            let suffix = Uuid::new_v4().simple().to_string();
            sanitize_file_name(&format!(
                "cover_letter_{}_{}_{}.docx",
                record.company_name(),
                record.position_title(),
                &suffix[..8]
            ))
        }
    };
    name.chars().filter(|c| !c.is_control()).collect()
}

/// Renders with today's local date and writes the file as `dir/filename`. Blocking.
pub fn write_letter(
    record: &LetterRecord,
    filename: String,
    dir: &Path,
) -> Result<RenderedLetter, RenderError> {
    let date = letter_date(chrono::Local::now().date_naive());
    let bytes = render_docx(record, &date)?;
    let path = dir.join(&filename);

    std::fs::write(&path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "Cover letter written");

    Ok(RenderedLetter {
        filename,
        path,
        bytes,
    })
}

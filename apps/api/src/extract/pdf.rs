//! PDF extraction: per-page text via lopdf, whole-document fallback via pdf-extract,
//! metadata from the trailer `Info` dictionary.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use lopdf::{Dictionary, Document, Object};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::extract::{ExtractError, ExtractedDocument, FileType, PageText};

/// `(Info key, metadata key)` pairs copied into the response.
const INFO_FIELDS: [(&[u8], &str); 7] = [
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Creator", "creator"),
    (b"Producer", "producer"),
    (b"CreationDate", "creation_date"),
    (b"ModDate", "modification_date"),
];

/// Both PDF parsers can panic on malformed font or stream data; a panic is reported
/// as a failed extraction.
pub fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument, ExtractError> {
    panic::catch_unwind(AssertUnwindSafe(|| parse_pdf(bytes))).unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        warn!("PDF parser panicked: {reason}");
        Err(ExtractError::ExtractionFailed(format!(
            "Error extracting PDF: {reason}"
        )))
    })
}

fn parse_pdf(bytes: &[u8]) -> Result<ExtractedDocument, ExtractError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ExtractError::ExtractionFailed(format!("Error extracting PDF: {e}")))?;

    let page_ids = doc.get_pages();
    let total_pages = page_ids.len();

    let mut pages = Vec::new();
    for page_number in page_ids.keys().copied() {
        match doc.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => pages.push(PageText {
                page_number,
                text: text.trim().to_string(),
            }),
            Ok(_) => debug!("PDF page {page_number} has no text layer"),
            Err(e) => warn!("Failed to extract text from PDF page {page_number}: {e}"),
        }
    }

    let mut full_text = pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    if full_text.is_empty() && total_pages > 0 {
        // lopdf misses text in some font encodings; pdf-extract decodes more of them.
        match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) => full_text = text,
            Err(e) => debug!("pdf-extract fallback failed: {e}"),
        }
    }

    let mut metadata = Map::new();
    metadata.insert("file_type".into(), FileType::Pdf.as_str().into());
    metadata.insert("total_pages".into(), total_pages.into());
    metadata.insert("file_size".into(), bytes.len().into());
    if let Some(info) = info_dictionary(&doc) {
        for (key, name) in INFO_FIELDS {
            let value = info
                .get(key)
                .ok()
                .and_then(|obj| obj.as_str().ok())
                .map(decode_text_string)
                .unwrap_or_default();
            metadata.insert(name.into(), Value::String(value));
        }
    }

    let mut document = ExtractedDocument::new(FileType::Pdf, &full_text, metadata);
    document.pages = Some(pages);
    Ok(document)
}

/// The `Info` entry may be an indirect reference or an inline dictionary.
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "parser panicked".to_string())
}

/// PDF text strings are UTF-16BE with a BOM, or a single-byte encoding.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    use super::*;

    fn text_operations(text: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    /// One page per entry; `None` is a page with an empty content stream.
    fn build_pdf(pages: &[Option<&str>], with_font: bool, title: Option<&str>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let resources_id = with_font.then(|| {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
            });
            doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            })
        });

        let mut kids = Vec::new();
        for &text in pages {
            let operations = text.map(text_operations).unwrap_or_default();
            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if let Some(resources_id) = resources_id {
                page.set("Resources", resources_id);
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(title) = title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title),
                "Author" => Object::string_literal("Jane Doe"),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pages_joined_with_blank_line_and_empty_pages_skipped() {
        let bytes = build_pdf(&[Some("Alpha"), None, Some("Omega")], true, Some("Resume"));
        let doc = extract_pdf(&bytes).unwrap();

        assert_eq!(doc.full_text, "Alpha\n\nOmega");
        let pages = doc.pages.unwrap();
        let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(pages[0].text, "Alpha");
        assert_eq!(doc.word_count, 2);
    }

    #[test]
    fn test_info_dictionary_becomes_metadata() {
        let bytes = build_pdf(&[Some("Alpha"), Some("Omega")], true, Some("Resume"));
        let doc = extract_pdf(&bytes).unwrap();

        assert_eq!(doc.metadata["title"], "Resume");
        assert_eq!(doc.metadata["author"], "Jane Doe");
        assert_eq!(doc.metadata["producer"], "");
        assert_eq!(doc.metadata["total_pages"], 2);
        assert_eq!(doc.metadata["file_type"], "PDF");
        assert_eq!(doc.metadata["file_size"], bytes.len());
    }

    #[test]
    fn test_missing_info_dictionary_leaves_fields_out() {
        let doc = extract_pdf(&build_pdf(&[Some("Alpha")], true, None)).unwrap();
        assert!(doc.metadata.get("title").is_none());
        assert_eq!(doc.metadata["total_pages"], 1);
    }

    #[test]
    fn test_parser_panic_is_extraction_failed() {
        // The page selects /F1 but declares no font resources.
        let bytes = build_pdf(&[Some("Hello")], false, None);
        match extract_pdf(&bytes) {
            Err(ExtractError::ExtractionFailed(msg)) => {
                assert!(msg.starts_with("Error extracting PDF"))
            }
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_message_from_payload() {
        let payload: Box<dyn Any + Send> = Box::new("Font");
        assert_eq!(panic_message(payload.as_ref()), "Font");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bad stream"));
        assert_eq!(panic_message(payload.as_ref()), "bad stream");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "parser panicked");
    }

    #[test]
    fn test_corrupt_pdf_is_extraction_failed() {
        let err = extract_pdf(b"%PDF-1.4 this is not really a pdf").unwrap_err();
        match err {
            ExtractError::ExtractionFailed(msg) => assert!(msg.starts_with("Error extracting PDF")),
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_utf16_text_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_plain_text_string() {
        assert_eq!(decode_text_string(b"Resume"), "Resume");
    }

    #[test]
    fn test_decode_latin1_text_string() {
        assert_eq!(decode_text_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}

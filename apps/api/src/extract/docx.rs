//! DOCX extraction: body paragraphs and top-level tables from `word/document.xml`,
//! core properties from `docProps/core.xml`.

use std::fmt::Display;
use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::extract::{ExtractError, ExtractedDocument, FileType};

const DOCUMENT_PART: &str = "word/document.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// `(core.xml local name, metadata key)` pairs copied into the response.
const CORE_FIELDS: [(&str, &str); 8] = [
    ("title", "title"),
    ("creator", "author"),
    ("subject", "subject"),
    ("keywords", "keywords"),
    ("description", "comments"),
    ("created", "created"),
    ("modified", "modified"),
    ("lastModifiedBy", "last_modified_by"),
];

/// Paragraphs and tables found in the document body.
#[derive(Debug, Default, PartialEq)]
struct DocumentBody {
    paragraphs: Vec<String>,
    tables: Vec<Vec<Vec<String>>>,
}

pub fn extract_docx(bytes: &[u8]) -> Result<ExtractedDocument, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(docx_error)?;

    let document_xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| docx_error(format!("missing {DOCUMENT_PART}")))?;
    let body = parse_document_body(&document_xml)?;

    let core = match read_part(&mut archive, CORE_PROPERTIES_PART)? {
        Some(xml) => parse_core_properties(&xml)?,
        None => Map::new(),
    };

    let mut full_text = String::new();
    for paragraph in &body.paragraphs {
        full_text.push_str(paragraph);
        full_text.push('\n');
    }
    for cell in body.tables.iter().flatten().flatten() {
        full_text.push_str(cell);
        full_text.push(' ');
    }

    let mut metadata = Map::new();
    metadata.insert("file_type".into(), FileType::Docx.as_str().into());
    metadata.insert("file_size".into(), bytes.len().into());
    metadata.insert("paragraph_count".into(), body.paragraphs.len().into());
    metadata.insert("table_count".into(), body.tables.len().into());
    for (_, key) in CORE_FIELDS {
        let value = core.get(key).cloned().unwrap_or_else(|| Value::from(""));
        metadata.insert(key.into(), value);
    }

    let mut document = ExtractedDocument::new(FileType::Docx, &full_text, metadata);
    document.paragraphs = Some(body.paragraphs);
    document.tables = Some(body.tables);
    Ok(document)
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ExtractError> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(docx_error(e)),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(docx_error)?;
    Ok(Some(xml))
}

/// Walks `w:body`. Paragraphs outside tables become body paragraphs; paragraphs
/// directly inside a top-level table cell become that cell's text. Nested tables
/// are skipped, matching how word processors expose `document.tables`.
///
/// Text boxes (`w:txbxContent`) are anchored inside a run and carry their own
/// paragraphs; their whole subtree is skipped.
fn parse_document_body(xml: &str) -> Result<DocumentBody, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut body = DocumentBody::default();

    let mut text_box_depth = 0usize;
    let mut table_depth = 0usize;
    let mut in_paragraph = false;
    let mut in_text_run = false;
    let mut paragraph = String::new();
    let mut table: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event().map_err(docx_error)?;
        match &event {
            Event::Start(e) if e.local_name().as_ref() == b"txbxContent" => {
                text_box_depth += 1;
                continue;
            }
            Event::End(e) if e.local_name().as_ref() == b"txbxContent" => {
                text_box_depth = text_box_depth.saturating_sub(1);
                continue;
            }
            Event::Eof => {}
            _ if text_box_depth > 0 => continue,
            _ => {}
        }

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        table = Vec::new();
                    }
                }
                b"tr" if table_depth == 1 => row = Vec::new(),
                b"tc" if table_depth == 1 => cell = Vec::new(),
                b"p" => {
                    in_paragraph = true;
                    paragraph.clear();
                }
                b"t" if in_paragraph => in_text_run = true,
                _ => {}
            },
            Event::Empty(e) if in_paragraph => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                paragraph.push_str(&t.unescape().map_err(docx_error)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    in_paragraph = false;
                    let text = paragraph.trim();
                    match table_depth {
                        0 if !text.is_empty() => body.paragraphs.push(text.to_string()),
                        1 => cell.push(paragraph.clone()),
                        _ => {}
                    }
                }
                b"tc" if table_depth == 1 => {
                    row.push(cell.join("\n").trim().to_string());
                }
                b"tr" if table_depth == 1 => table.push(std::mem::take(&mut row)),
                b"tbl" => {
                    if table_depth == 1 {
                        body.tables.push(std::mem::take(&mut table));
                    }
                    table_depth = table_depth.saturating_sub(1);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}

/// Reads the Dublin Core fields listed in `CORE_FIELDS`, keyed by metadata name.
fn parse_core_properties(xml: &str) -> Result<Map<String, Value>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut properties = Map::new();
    let mut current: Option<&'static str> = None;

    loop {
        match reader.read_event().map_err(docx_error)? {
            Event::Start(e) => {
                let name = e.local_name();
                current = CORE_FIELDS
                    .iter()
                    .find(|(local, _)| local.as_bytes() == name.as_ref())
                    .map(|(_, key)| *key);
            }
            Event::Text(t) => {
                if let Some(key) = current {
                    let text = t.unescape().map_err(docx_error)?;
                    properties.insert(key.to_string(), Value::String(text.trim().to_string()));
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(properties)
}

fn docx_error(e: impl Display) -> ExtractError {
    ExtractError::ExtractionFailed(format!("Error extracting DOCX: {e}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn document_xml(body: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document {NS}><w:body>{body}</w:body></w:document>"#)
    }

    fn build_docx(document: &str, core: Option<&str>) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        if let Some(core) = core {
            zip.start_file(CORE_PROPERTIES_PART, options).unwrap();
            zip.write_all(core.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    #[test]
    fn test_paragraphs_are_newline_joined_and_trimmed() {
        let xml = document_xml(&format!(
            "{}{}<w:p/>{}",
            para("  Jane Doe "),
            para("   "),
            para("Engineer")
        ));
        let doc = extract_docx(&build_docx(&xml, None)).unwrap();
        assert_eq!(doc.full_text, "Jane Doe\nEngineer");
        assert_eq!(doc.paragraphs.unwrap(), vec!["Jane Doe", "Engineer"]);
        assert_eq!(doc.word_count, 3);
    }

    #[test]
    fn test_table_only_document_still_has_text() {
        let xml = document_xml(&format!(
            "<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>",
            para("Rust")
        ));
        let doc = extract_docx(&build_docx(&xml, None)).unwrap();
        assert!(doc.word_count >= 1);
        assert!(doc.full_text.contains("Rust"));
        assert!(doc.paragraphs.unwrap().is_empty());
        assert_eq!(doc.tables.unwrap(), vec![vec![vec!["Rust".to_string()]]]);
    }

    #[test]
    fn test_table_cells_are_space_joined_after_paragraphs() {
        let xml = document_xml(&format!(
            "{}<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para("Skills"),
            para("Rust"),
            para("Go"),
            para("SQL"),
            para("Kafka"),
        ));
        let doc = extract_docx(&build_docx(&xml, None)).unwrap();
        assert_eq!(doc.full_text, "Skills\nRust Go SQL Kafka");
        let tables = doc.tables.unwrap();
        assert_eq!(tables[0].len(), 2);
        assert_eq!(tables[0][1], vec!["SQL", "Kafka"]);
    }

    #[test]
    fn test_multi_paragraph_cell_joins_with_newline() {
        let xml = document_xml(&format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc></w:tr></w:tbl>",
            para("line one"),
            para("line two")
        ));
        let doc = extract_docx(&build_docx(&xml, None)).unwrap();
        assert_eq!(doc.tables.unwrap()[0][0][0], "line one\nline two");
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let xml = document_xml(
            "<w:p><w:r><w:t>A &amp; B</w:t><w:tab/><w:t>C</w:t><w:br/><w:t>D</w:t></w:r></w:p>",
        );
        let doc = extract_docx(&build_docx(&xml, None)).unwrap();
        assert_eq!(doc.paragraphs.unwrap(), vec!["A & B\tC\nD"]);
    }

    #[test]
    fn test_text_box_does_not_split_enclosing_paragraph() {
        let text_box = "<w:txbxContent><w:p><w:r><w:t>Sidebar</w:t></w:r></w:p></w:txbxContent>";
        let xml = document_xml(&format!(
            "<w:p><w:r><w:t>Jane Doe</w:t></w:r>\
             <w:r><mc:AlternateContent><mc:Choice Requires=\"wps\"><w:drawing><wps:txbx>{text_box}</wps:txbx></w:drawing></mc:Choice>\
             <mc:Fallback><w:pict><v:textbox>{text_box}</v:textbox></w:pict></mc:Fallback></mc:AlternateContent></w:r>\
             <w:r><w:t> Engineer</w:t></w:r></w:p>{}",
            para("Summary")
        ));
        let doc = extract_docx(&build_docx(&xml, None)).unwrap();
        assert_eq!(doc.paragraphs.unwrap(), vec!["Jane Doe Engineer", "Summary"]);
        assert_eq!(doc.full_text, "Jane Doe Engineer\nSummary");
    }

    #[test]
    fn test_core_properties_are_read() {
        let core = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Resume</dc:title>
  <dc:creator>Jane Doe</dc:creator>
  <cp:keywords>rust, backend</cp:keywords>
  <dc:description>Latest</dc:description>
  <cp:lastModifiedBy>Jane</cp:lastModifiedBy>
  <dcterms:created>2024-01-02T03:04:05Z</dcterms:created>
</cp:coreProperties>"#;
        let doc = extract_docx(&build_docx(&document_xml(&para("x")), Some(core))).unwrap();
        assert_eq!(doc.metadata["title"], "Resume");
        assert_eq!(doc.metadata["author"], "Jane Doe");
        assert_eq!(doc.metadata["keywords"], "rust, backend");
        assert_eq!(doc.metadata["comments"], "Latest");
        assert_eq!(doc.metadata["last_modified_by"], "Jane");
        assert_eq!(doc.metadata["created"], "2024-01-02T03:04:05Z");
        assert_eq!(doc.metadata["subject"], "");
        assert_eq!(doc.metadata["paragraph_count"], 1);
        assert_eq!(doc.metadata["table_count"], 0);
        assert_eq!(doc.metadata["file_type"], "DOCX");
    }

    #[test]
    fn test_not_a_zip_is_extraction_failed() {
        let err = extract_docx(b"plain text pretending to be docx").unwrap_err();
        match err {
            ExtractError::ExtractionFailed(msg) => assert!(msg.starts_with("Error extracting DOCX")),
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_zip_without_document_part_is_extraction_failed() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("hello.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(
            extract_docx(&bytes),
            Err(ExtractError::ExtractionFailed(_))
        ));
    }
}

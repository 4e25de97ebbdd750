//! Minimal WordprocessingML package writer.
//!
//! Writes only the parts Word needs to open a document. Every block becomes one
//! paragraph; an empty block is an empty paragraph.

use std::borrow::Cow;
use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::render::RenderError;

pub const FONT_FAMILY: &str = "Times New Roman";
/// Half-points, so 24 is 12 pt.
pub const FONT_SIZE_HALF_POINTS: u32 = 24;

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Packages `blocks` as a .docx. `title` and `author` go into the core properties.
pub fn write_docx(blocks: &[String], title: &str, author: &str) -> Result<Vec<u8>, RenderError> {
    let document_xml = document_xml(blocks)?;
    let styles_xml = styles_xml();
    let core_xml = core_xml(title, author);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
        ("word/document.xml", &document_xml),
        ("word/styles.xml", styles_xml.as_bytes()),
        ("docProps/core.xml", core_xml.as_bytes()),
    ];
    for (name, contents) in parts {
        zip.start_file(name, options)?;
        zip.write_all(contents)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn document_xml(blocks: &[String]) -> Result<Vec<u8>, RenderError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    write(
        &mut writer,
        Event::Start(BytesStart::new("w:document").with_attributes([("xmlns:w", WORDML_NS)])),
    )?;
    write(&mut writer, Event::Start(BytesStart::new("w:body")))?;

    for block in blocks {
        if block.is_empty() {
            write(&mut writer, Event::Empty(BytesStart::new("w:p")))?;
            continue;
        }
        write(&mut writer, Event::Start(BytesStart::new("w:p")))?;
        write(&mut writer, Event::Start(BytesStart::new("w:r")))?;
        for (i, line) in block.split('\n').enumerate() {
            if i > 0 {
                write(&mut writer, Event::Empty(BytesStart::new("w:br")))?;
            }
            write(
                &mut writer,
                Event::Start(BytesStart::new("w:t").with_attributes([("xml:space", "preserve")])),
            )?;
            write(&mut writer, Event::Text(BytesText::new(&xml_text(line))))?;
            write(&mut writer, Event::End(BytesEnd::new("w:t")))?;
        }
        write(&mut writer, Event::End(BytesEnd::new("w:r")))?;
        write(&mut writer, Event::End(BytesEnd::new("w:p")))?;
    }

    // US letter, one inch margins.
    write(&mut writer, Event::Start(BytesStart::new("w:sectPr")))?;
    write(
        &mut writer,
        Event::Empty(BytesStart::new("w:pgSz").with_attributes([("w:w", "12240"), ("w:h", "15840")])),
    )?;
    write(
        &mut writer,
        Event::Empty(BytesStart::new("w:pgMar").with_attributes([
            ("w:top", "1440"),
            ("w:right", "1440"),
            ("w:bottom", "1440"),
            ("w:left", "1440"),
            ("w:header", "720"),
            ("w:footer", "720"),
            ("w:gutter", "0"),
        ])),
    )?;
    write(&mut writer, Event::End(BytesEnd::new("w:sectPr")))?;

    write(&mut writer, Event::End(BytesEnd::new("w:body")))?;
    write(&mut writer, Event::End(BytesEnd::new("w:document")))?;

    Ok(writer.into_inner().into_inner())
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), RenderError> {
    writer
        .write_event(event)
        .map_err(|e| RenderError::Xml(e.to_string()))
}

/// Drops characters XML 1.0 does not allow in a document.
fn xml_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn styles_xml() -> String {
    let run_properties = format!(
        r#"<w:rPr><w:rFonts w:ascii="{FONT_FAMILY}" w:hAnsi="{FONT_FAMILY}" w:eastAsia="{FONT_FAMILY}" w:cs="{FONT_FAMILY}"/><w:sz w:val="{FONT_SIZE_HALF_POINTS}"/><w:szCs w:val="{FONT_SIZE_HALF_POINTS}"/></w:rPr>"#
    );
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{WORDML_NS}"><w:docDefaults><w:rPrDefault>{run_properties}</w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/>{run_properties}</w:style></w:styles>"#
    )
}

fn core_xml(title: &str, author: &str) -> String {
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{title}</dc:title><dc:creator>{author}</dc:creator><cp:lastModifiedBy>{author}</cp:lastModifiedBy><dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified></cp:coreProperties>"#,
        title = escape(&*xml_text(title)),
        author = escape(&*xml_text(author)),
    )
}

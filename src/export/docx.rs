use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSection {
    pub heading: String,
    pub body: String,
}

/// Minimal WordprocessingML package: a title, then a bold heading per section
/// and one paragraph per body line.
pub fn docx_document(title: &str, sections: &[DocSection]) -> Result<Vec<u8>> {
    let document = document_xml(title, sections)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let parts: [(&str, &[u8]); 3] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("word/document.xml", document.as_slice()),
    ];
    for (name, bytes) in parts {
        writer
            .start_file(name, options)
            .with_context(|| format!("failed to start docx part {}", name))?;
        writer
            .write_all(bytes)
            .with_context(|| format!("failed to write docx part {}", name))?;
    }
    let cursor = writer.finish().with_context(|| "failed to finish docx archive")?;
    Ok(cursor.into_inner())
}

fn document_xml(title: &str, sections: &[DocSection]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", WORD_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;

    write_paragraph(&mut writer, title, Some(32))?;
    for section in sections {
        write_paragraph(&mut writer, &section.heading, Some(26))?;
        for line in section.body.lines() {
            write_paragraph(&mut writer, line, None)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(writer.into_inner().into_inner())
}

/// `heading_size` is in half-points; headings are bold.
fn write_paragraph(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    text: &str,
    heading_size: Option<u32>,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    if let Some(size) = heading_size {
        let size = size.to_string();
        writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        writer.write_event(Event::Empty(BytesStart::new("w:b")))?;
        writer.write_event(Event::Empty(
            BytesStart::new("w:sz").with_attributes([("w:val", size.as_str())]),
        ))?;
        writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
    }
    writer.write_event(Event::Start(
        BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
    ))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

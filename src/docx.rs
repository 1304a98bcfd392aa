//! Report document writer over an operator-supplied `.docx` template.
//!
//! The template is copied entry-for-entry; only `word/document.xml` is
//! rewritten, with generated paragraphs inserted at the end of the body
//! ahead of the body-level section properties.

use crate::error::{ConfigError, Error, IoError, Result};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";

pub struct ReportDocument {
    template: Vec<u8>,
    label: String,
    document_xml: String,
    insert_at: usize,
    generated: String,
}

impl ReportDocument {
    /// Load the template; absence and unreadability are configuration errors
    pub fn open_template(path: &Path) -> Result<Self> {
        let label = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::TemplateMissing(label).into());
        }
        let bytes = fs::read(path).map_err(|e| ConfigError::TemplateUnreadable {
            path: label.clone(),
            details: e.to_string(),
        })?;
        Self::from_template_bytes(bytes, &label)
    }

    pub fn from_template_bytes(template: Vec<u8>, label: &str) -> Result<Self> {
        let unreadable = |details: String| {
            Error::Config(ConfigError::TemplateUnreadable {
                path: label.to_string(),
                details,
            })
        };

        let document_xml = {
            let mut archive = ZipArchive::new(Cursor::new(template.as_slice()))
                .map_err(|e| unreadable(e.to_string()))?;
            let mut xml = String::new();
            archive
                .by_name(DOCUMENT_PART)
                .map_err(|e| unreadable(e.to_string()))?
                .read_to_string(&mut xml)
                .map_err(|e| unreadable(e.to_string()))?;
            xml
        };

        let insert_at = body_insertion_point(&document_xml)
            .ok_or_else(|| unreadable("document body not found".to_string()))?;

        Ok(Self {
            label: label.to_string(),
            template,
            document_xml,
            insert_at,
            generated: String::new(),
        })
    }

    pub fn add_page_break(&mut self) {
        self.generated
            .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
    }

    /// Heading paragraph using the template's `Heading{level}` style
    pub fn add_heading(&mut self, text: &str, level: u8) {
        self.push_paragraph(Some(&format!("Heading{}", level)), text);
    }

    pub fn add_paragraph(&mut self, text: &str) {
        self.push_paragraph(None, text);
    }

    /// `ListParagraph` paragraph with a leading bullet glyph
    pub fn add_bullet(&mut self, text: &str) {
        self.push_paragraph(Some("ListParagraph"), &format!("\u{2022} {}", text));
    }

    fn push_paragraph(&mut self, style: Option<&str>, text: &str) {
        self.generated.push_str("<w:p>");
        if let Some(style) = style {
            self.generated
                .push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, style));
        }
        self.generated.push_str("<w:r>");
        push_run_content(&mut self.generated, text);
        self.generated.push_str("</w:r></w:p>");
    }

    /// Encode the template with the generated content spliced in
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let encode_failed = |details: String| {
            Error::Io(IoError::EncodeFailed {
                path: self.label.clone(),
                details,
            })
        };

        let mut xml = String::with_capacity(self.document_xml.len() + self.generated.len());
        xml.push_str(&self.document_xml[..self.insert_at]);
        xml.push_str(&self.generated);
        xml.push_str(&self.document_xml[self.insert_at..]);

        let mut archive = ZipArchive::new(Cursor::new(self.template.as_slice()))
            .map_err(|e| encode_failed(e.to_string()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for i in 0..archive.len() {
            let entry = archive
                .by_index_raw(i)
                .map_err(|e| encode_failed(e.to_string()))?;
            if entry.name() == DOCUMENT_PART {
                continue;
            }
            writer
                .raw_copy_file(entry)
                .map_err(|e| encode_failed(e.to_string()))?;
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(DOCUMENT_PART, options)
            .map_err(|e| encode_failed(e.to_string()))?;
        writer
            .write_all(xml.as_bytes())
            .map_err(|e| encode_failed(e.to_string()))?;

        let cursor = writer.finish().map_err(|e| encode_failed(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// Byte offset for new body content.
///
/// The body-level `w:sectPr` must stay the last child of `w:body`; a
/// `w:sectPr` nested in a paragraph's properties does not count.
fn body_insertion_point(xml: &str) -> Option<usize> {
    let body_end = xml.rfind("</w:body>")?;
    let body = &xml[..body_end];

    let last_block_end = ["</w:p>", "</w:tbl>"]
        .iter()
        .filter_map(|tag| body.rfind(tag).map(|i| i + tag.len()))
        .max()
        .unwrap_or(0);

    match body.rfind("<w:sectPr") {
        Some(section) if section >= last_block_end => Some(section),
        _ => Some(body_end),
    }
}

/// Escaped run text; newlines become breaks, tabs become tab stops
fn push_run_content(out: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                out.push_str("<w:tab/>");
            }
            out.push_str(r#"<w:t xml:space="preserve">"#);
            out.push_str(&escape_xml(segment));
            out.push_str("</w:t>");
        }
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // not representable in XML 1.0
            c if c.is_control() => {}
            '\u{fffe}' | '\u{ffff}' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

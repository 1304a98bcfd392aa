#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use llm_policy_audit::config::{BackendSettings, Limits};
use llm_policy_audit::document::DocumentExtractor;
use llm_policy_audit::llm::{Backend, ClientRegistry, LlmProvider};
use llm_policy_audit::{ArtifactStore, Error, Pipeline};
use rust_xlsxwriter::Workbook;
use std::collections::VecDeque;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const DOCUMENT_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:body><w:p><w:r><w:t>Compliance Review</w:t></w:r></w:p>"#,
    r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
);

/// Workbook with a single sheet of string cells; empty strings stay blank
pub fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, cells) in rows.iter().enumerate() {
        for (c, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Workbook whose first column holds numeric ids, like tables typed in Excel
pub fn xlsx_numeric_ids<const N: usize>(headers: &[&str], rows: &[(f64, [&str; N])]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, header) in headers.iter().enumerate() {
        sheet.write_string(0, c as u16, *header).unwrap();
    }
    for (r, (id, cells)) in rows.iter().enumerate() {
        let r = r as u32 + 1;
        sheet.write_number(r, 0, *id).unwrap();
        for (c, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r, c as u16 + 1, *value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Minimal docx template: content types plus a one-paragraph body
pub fn docx_template() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("[Content_Types].xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(DOCUMENT_XML.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// `word/document.xml` of a generated report
pub fn report_xml(docx: &[u8]) -> String {
    let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

/// Replays canned responses in order and records every user prompt
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _model: &str, _system: &str, user: &str) -> Result<String, Error> {
        self.prompts.lock().unwrap().push(user.to_string());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "no more replies".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Returns fixed text for any document bytes
pub struct FixedText(pub &'static str);

impl DocumentExtractor for FixedText {
    fn extract_pages(&self, _bytes: &[u8]) -> llm_policy_audit::Result<Vec<String>> {
        Ok(vec![self.0.to_string()])
    }
}

pub const POLICY_PDF: &[u8] = b"%PDF-1.7 stand-in bytes";

/// Pipeline over a temp store whose clock advances one second per timestamp,
/// with the template written next to the store.
pub fn pipeline(dir: &Path, provider: Arc<dyn LlmProvider>) -> Pipeline {
    let template_path = dir.join("template_report.docx");
    std::fs::write(&template_path, docx_template()).unwrap();
    pipeline_with_template(dir, provider, &template_path)
}

pub fn pipeline_with_template(
    dir: &Path,
    provider: Arc<dyn LlmProvider>,
    template_path: &Path,
) -> Pipeline {
    let ticks = Arc::new(AtomicI64::new(0));
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let store = ArtifactStore::open(dir.join("outputs"))
        .unwrap()
        .with_clock(Arc::new(move || {
            start + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst))
        }));

    let registry = ClientRegistry::new(BackendSettings::default())
        .with_provider(Backend::Anthropic, provider);

    Pipeline::new(store, registry, Limits::default(), 3, template_path)
        .with_extractor(Box::new(FixedText("All staff must use multi-factor authentication (MFA).")))
}

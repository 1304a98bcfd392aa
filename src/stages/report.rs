//! Report stage: render rows with suggestions into the report template

use super::Pipeline;
use crate::artifact::carried_suffix;
use crate::document::cap_chars;
use crate::docx::ReportDocument;
use crate::config::Limits;
use crate::error::Result;
use crate::table::{Row, Sheet};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::info;

const REQUIRED_COLUMNS: &[&str] = &["suggestions"];

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub docx_file: String,
    /// False when no row had suggestions, even if the table had rows
    pub rows_reported: bool,
}

/// Sort key for a control id: numeric ids first, by value, then text ids
#[derive(Debug, Clone, PartialEq)]
enum IdKey {
    Number(f64),
    Text(String),
}

impl IdKey {
    fn parse(id: &str) -> Self {
        match id.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => IdKey::Number(n),
            _ => IdKey::Text(id.to_string()),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IdKey::Number(a), IdKey::Number(b)) => a.total_cmp(b),
            (IdKey::Number(_), IdKey::Text(_)) => Ordering::Less,
            (IdKey::Text(_), IdKey::Number(_)) => Ordering::Greater,
            (IdKey::Text(a), IdKey::Text(b)) => a.cmp(b),
        }
    }
}

/// One row ready for rendering
#[derive(Debug, Clone, PartialEq)]
struct Finding {
    category: String,
    id: IdKey,
    title: String,
    control: String,
    items: Vec<String>,
}

impl Pipeline {
    /// Run report over a rewrite (or analyze) artifact
    pub fn report(&self, input_filename: &str) -> Result<ReportOutcome> {
        // Template first: a missing template is the operator's problem,
        // whatever the request names.
        let mut doc = ReportDocument::open_template(&self.template_path)?;

        let input = self.store.read(input_filename)?;
        let sheet = Sheet::from_xlsx_bytes(&input)?;
        sheet.require_columns(REQUIRED_COLUMNS)?;
        let rows = sheet.rows();

        let findings = collect_findings(&rows, &self.limits);
        info!(
            "Reporting {} of {} controls from {}",
            findings.len(),
            rows.len(),
            input_filename
        );

        let mut last_category: Option<&str> = None;
        for finding in &findings {
            if last_category.is_none() {
                doc.add_page_break();
            }
            if last_category != Some(finding.category.as_str()) {
                doc.add_heading(&finding.category, 2);
                last_category = Some(finding.category.as_str());
            }

            doc.add_heading(&finding.title, 3);
            doc.add_paragraph(&finding.control);
            for item in &finding.items {
                doc.add_bullet(item);
            }
        }

        let docx_file = format!(
            "{}_{}.docx",
            self.store.timestamp(),
            carried_suffix(input_filename)
        );
        self.store.write(&docx_file, &doc.to_bytes()?)?;

        info!("Report wrote {}", docx_file);

        Ok(ReportOutcome {
            docx_file,
            rows_reported: !findings.is_empty(),
        })
    }
}

/// Rows with suggestions, sanitized and sorted by (category, id)
fn collect_findings(rows: &[Row], limits: &Limits) -> Vec<Finding> {
    let max_text = limits.max_report_text_chars;

    let mut findings: Vec<Finding> = rows
        .iter()
        .filter(|row| !row.is_blank("suggestions"))
        .map(|row| Finding {
            category: sanitize_text(&row.text("category"), max_text),
            id: IdKey::parse(&row.id()),
            title: sanitize_text(&row.text("title"), max_text),
            control: sanitize_text(&row.text("control"), max_text),
            items: bullet_items(&row.text("rewritten_suggestions"), limits),
        })
        .collect();

    findings.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.id.compare(&b.id)));
    findings
}

/// Split a newline-joined cell back into bounded bullet items
fn bullet_items(raw: &str, limits: &Limits) -> Vec<String> {
    raw.split('\n')
        .map(|item| sanitize_text(item, limits.max_suggestion_chars))
        .filter(|item| !item.trim().is_empty())
        .take(limits.max_suggestion_items)
        .collect()
}

/// Strip control characters (tab, LF and CR survive), then cap length
fn sanitize_text(text: &str, max_chars: usize) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(*c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}'))
        .collect();
    cap_chars(&stripped, max_chars)
}

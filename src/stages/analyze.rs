//! Analyze stage: judge each control row against the policy document

use super::{encode_json, Pipeline};
use crate::artifact::analysis_suffix;
use crate::document;
use crate::error::{FormatError, Result};
use crate::llm::{invoke, Backend, Invocation};
use crate::prompts::build_analysis_prompt;
use crate::table::{Cell, Sheet};
use crate::validate::{validate_verdict, MatchVerdict};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

const REQUIRED_FIELDS: &[&str] = &["match", "if_yes_reason", "suggestions"];
const REQUIRED_COLUMNS: &[&str] = &["id", "title", "control"];
const APPENDED_COLUMNS: &[&str] = &["match", "if_yes_reason", "suggestions", "selected_model"];

pub struct AnalyzeRequest<'a> {
    pub document: &'a [u8],
    pub table: &'a [u8],
    pub table_filename: &'a str,
    pub client_name: &'a str,
    pub system_instructions: &'a str,
    pub backend: Backend,
    pub model: &'a str,
}

/// Validated verdict for one control row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub control: String,
    #[serde(rename = "match")]
    pub verdict: MatchVerdict,
    pub if_yes_reason: String,
    pub suggestions: String,
    pub selected_model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutcome {
    pub json_file: String,
    pub xlsx_file: String,
    pub results: Vec<AnalysisRecord>,
}

impl Pipeline {
    /// Run analyze: verdict per row, then a JSON array and an augmented table
    pub async fn analyze(&self, request: AnalyzeRequest<'_>) -> Result<AnalyzeOutcome> {
        let limits = &self.limits;

        document::validate_pdf(request.document, limits.max_document_bytes)?;
        if request.table.len() > limits.max_table_bytes {
            return Err(FormatError::TableTooLarge {
                size: request.table.len(),
                max: limits.max_table_bytes,
            }
            .into());
        }

        let mut sheet = Sheet::from_xlsx_bytes(request.table)?;
        sheet.require_columns(REQUIRED_COLUMNS)?;
        sheet.reject_existing_columns(APPENDED_COLUMNS)?;
        let rows = sheet.rows();

        let document_text = document::extract_text(
            self.extractor.as_ref(),
            request.document,
            limits.max_document_bytes,
            limits.max_document_text_chars,
        )?;

        info!(
            "Analyzing {} controls from {} with {} / {}",
            rows.len(),
            request.table_filename,
            request.backend,
            request.model
        );

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let user_prompt = build_analysis_prompt(row, &document_text);
            debug!("Control {}: prompt {} chars", row.id(), user_prompt.len());

            let object = invoke(
                &self.registry,
                self.max_attempts,
                &Invocation {
                    backend: request.backend,
                    model: request.model,
                    system: request.system_instructions,
                    user: &user_prompt,
                    required_fields: REQUIRED_FIELDS,
                },
            )
            .await?;
            let verdict = validate_verdict(&object, limits.max_field_chars)?;
            debug!("Control {}: {}", row.id(), verdict.verdict);

            results.push(AnalysisRecord {
                id: row.id(),
                control: row.text("control"),
                verdict: verdict.verdict,
                if_yes_reason: verdict.if_yes_reason,
                suggestions: verdict.suggestions,
                selected_model: request.model.to_string(),
            });
        }

        let by_id: HashMap<&str, &AnalysisRecord> =
            results.iter().map(|r| (r.id.as_str(), r)).collect();
        sheet.append_columns(APPENDED_COLUMNS, |id| {
            by_id.get(id).map(|r| {
                vec![
                    Cell::from(r.verdict.as_str()),
                    Cell::from(r.if_yes_reason.as_str()),
                    Cell::from(r.suggestions.as_str()),
                    Cell::from(r.selected_model.as_str()),
                ]
            })
        })?;

        let timestamp = self.store.timestamp();
        let suffix = analysis_suffix(request.client_name, request.table_filename);
        let json_file = format!("{}_{}_analysis.json", timestamp, suffix);
        let xlsx_file = format!("{}_{}.xlsx", timestamp, suffix);

        let json = encode_json(&results, &json_file)?;
        let xlsx = sheet.to_xlsx_bytes()?;
        self.store.write(&json_file, &json)?;
        self.store.write(&xlsx_file, &xlsx)?;

        info!("Analyze wrote {} and {}", json_file, xlsx_file);

        Ok(AnalyzeOutcome {
            json_file,
            xlsx_file,
            results,
        })
    }
}

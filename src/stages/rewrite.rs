//! Rewrite stage: turn analyze suggestions into short, actionable items

use super::{encode_json, Pipeline};
use crate::artifact::carried_suffix;
use crate::error::Result;
use crate::llm::{invoke, Backend, Invocation};
use crate::prompts::build_rewrite_prompt;
use crate::table::{Cell, Sheet};
use crate::validate::{validate_rewrite, RewriteBounds};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

const REQUIRED_FIELDS: &[&str] = &["rewritten_suggestions"];
const REQUIRED_COLUMNS: &[&str] = &["id", "title", "control", "suggestions"];
// `selected_model` is already taken by the analyze column
const APPENDED_COLUMNS: &[&str] = &["rewritten_suggestions", "rewrite_selected_model"];

pub struct RewriteRequest<'a> {
    pub input_filename: &'a str,
    pub system_instructions: &'a str,
    pub backend: Backend,
    pub model: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRecord {
    pub id: String,
    pub rewritten_suggestions: Vec<String>,
    pub selected_model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteOutcome {
    pub json_file: String,
    pub xlsx_file: String,
    pub results: Vec<RewriteRecord>,
}

impl Pipeline {
    /// Run rewrite over an analyze artifact.
    ///
    /// Rows with blank `suggestions` get an empty result without a model call.
    pub async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<RewriteOutcome> {
        let input = self.store.read(request.input_filename)?;
        let mut sheet = Sheet::from_xlsx_bytes(&input)?;
        sheet.require_columns(REQUIRED_COLUMNS)?;
        sheet.reject_existing_columns(APPENDED_COLUMNS)?;
        let rows = sheet.rows();

        info!(
            "Rewriting suggestions for {} controls from {} with {} / {}",
            rows.len(),
            request.input_filename,
            request.backend,
            request.model
        );

        let bounds = RewriteBounds {
            max_items: self.limits.max_suggestion_items,
            max_item_chars: self.limits.max_suggestion_chars,
        };

        let mut results = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            let rewritten = if row.is_blank("suggestions") {
                skipped += 1;
                Vec::new()
            } else {
                let user_prompt = build_rewrite_prompt(row);
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
                validate_rewrite(&object, bounds)?
            };

            results.push(RewriteRecord {
                id: row.id(),
                rewritten_suggestions: rewritten,
                selected_model: request.model.to_string(),
            });
        }
        debug!("{} controls had no suggestions to rewrite", skipped);

        let by_id: HashMap<&str, &RewriteRecord> =
            results.iter().map(|r| (r.id.as_str(), r)).collect();
        sheet.append_columns(APPENDED_COLUMNS, |id| {
            by_id.get(id).map(|r| {
                vec![
                    Cell::Text(r.rewritten_suggestions.join("\n")),
                    Cell::from(r.selected_model.as_str()),
                ]
            })
        })?;

        let timestamp = self.store.timestamp();
        let suffix = carried_suffix(request.input_filename);
        let json_file = format!("{}_{}_rewrite.json", timestamp, suffix);
        let xlsx_file = format!("{}_{}.xlsx", timestamp, suffix);

        let json = encode_json(&results, &json_file)?;
        let xlsx = sheet.to_xlsx_bytes()?;
        self.store.write(&json_file, &json)?;
        self.store.write(&xlsx_file, &xlsx)?;

        info!("Rewrite wrote {} and {}", json_file, xlsx_file);

        Ok(RewriteOutcome {
            json_file,
            xlsx_file,
            results,
        })
    }
}

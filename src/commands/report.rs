use super::spinner;
use crate::config::Config;
use crate::stages::Pipeline;
use anyhow::{Context, Result};
use colored::Colorize;

pub fn report_command(config: &Config, input: &str, json: bool) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;

    let pb = spinner("Generating report...");
    let outcome = match pipeline.report(input) {
        Ok(outcome) => {
            pb.finish_with_message("Report generated");
            outcome
        }
        Err(e) => {
            pb.finish_with_message("Report failed");
            tracing::error!("{}", e.context());
            return Err(e).context("Report stage failed");
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if !outcome.rows_reported {
        println!("{}", "No controls had suggestions; the report has no findings.".yellow());
    }
    println!("Report: {}", outcome.docx_file);

    Ok(())
}

use super::{colored_verdict, spinner, InstructionArgs};
use crate::config::Config;
use crate::llm::Backend;
use crate::stages::{AnalyzeRequest, Pipeline};
use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Policy document (PDF)
    #[arg(long)]
    pub document: PathBuf,

    /// Control table (XLSX) with id, title and control columns
    #[arg(long)]
    pub table: PathBuf,

    /// Client name, used in output filenames
    #[arg(long)]
    pub client: String,

    #[command(flatten)]
    pub instructions: InstructionArgs,

    /// Backend tag: anthropic, openai or ollama
    #[arg(long)]
    pub backend: String,

    /// Model identifier passed to the backend
    #[arg(long)]
    pub model: String,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn analyze_command(config: &Config, args: AnalyzeArgs) -> Result<()> {
    let backend: Backend = args.backend.parse()?;
    let instructions = args.instructions.resolve()?;

    let document = fs::read(&args.document)
        .with_context(|| format!("Failed to read document {}", args.document.display()))?;
    let table = fs::read(&args.table)
        .with_context(|| format!("Failed to read table {}", args.table.display()))?;
    let table_filename = args
        .table
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pipeline = Pipeline::from_config(config)?;

    let pb = spinner(&format!("Analyzing controls with {} / {}...", backend, args.model));
    let outcome = pipeline
        .analyze(AnalyzeRequest {
            document: &document,
            table: &table,
            table_filename: &table_filename,
            client_name: &args.client,
            system_instructions: &instructions,
            backend,
            model: &args.model,
        })
        .await;

    let outcome = match outcome {
        Ok(outcome) => {
            pb.finish_with_message(format!("Analyzed {} controls", outcome.results.len()));
            outcome
        }
        Err(e) => {
            pb.finish_with_message("Analyze failed");
            tracing::error!("{}", e.context());
            return Err(e).context("Analyze stage failed");
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    for record in &outcome.results {
        println!("  {:<12} {}", record.id, colored_verdict(record.verdict));
    }
    println!();
    println!("Results: {}", outcome.json_file);
    println!("Table:   {}", outcome.xlsx_file);

    Ok(())
}

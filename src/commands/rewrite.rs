use super::{spinner, InstructionArgs};
use crate::config::Config;
use crate::llm::Backend;
use crate::stages::{Pipeline, RewriteRequest};
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct RewriteArgs {
    /// Analyze output table, by artifact filename
    #[arg(long)]
    pub input: String,

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

pub async fn rewrite_command(config: &Config, args: RewriteArgs) -> Result<()> {
    let backend: Backend = args.backend.parse()?;
    let instructions = args.instructions.resolve()?;
    let pipeline = Pipeline::from_config(config)?;

    let pb = spinner(&format!("Rewriting suggestions with {} / {}...", backend, args.model));
    let outcome = pipeline
        .rewrite(RewriteRequest {
            input_filename: &args.input,
            system_instructions: &instructions,
            backend,
            model: &args.model,
        })
        .await;

    let outcome = match outcome {
        Ok(outcome) => {
            pb.finish_with_message(format!("Rewrote {} controls", outcome.results.len()));
            outcome
        }
        Err(e) => {
            pb.finish_with_message("Rewrite failed");
            tracing::error!("{}", e.context());
            return Err(e).context("Rewrite stage failed");
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    for record in &outcome.results {
        println!(
            "  {:<12} {} suggestion(s)",
            record.id,
            record.rewritten_suggestions.len()
        );
    }
    println!();
    println!("Results: {}", outcome.json_file);
    println!("Table:   {}", outcome.xlsx_file);

    Ok(())
}

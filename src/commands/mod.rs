//! CLI commands over the stage entry points

pub mod analyze;
pub mod artifacts;
pub mod report;
pub mod rewrite;

use anyhow::{Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;

use crate::validate::MatchVerdict;

/// System instructions, given inline or read from a file
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct InstructionArgs {
    /// System instructions for the model
    #[arg(long)]
    pub instructions: Option<String>,

    /// Read system instructions from a file
    #[arg(long)]
    pub instructions_file: Option<PathBuf>,
}

impl InstructionArgs {
    pub fn resolve(&self) -> Result<String> {
        match (&self.instructions, &self.instructions_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read instructions from {}", path.display())),
            (None, None) => anyhow::bail!("Either --instructions or --instructions-file is required"),
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn colored_verdict(verdict: MatchVerdict) -> ColoredString {
    match verdict {
        MatchVerdict::Yes => verdict.as_str().green(),
        MatchVerdict::Partial => verdict.as_str().yellow(),
        MatchVerdict::No => verdict.as_str().red(),
    }
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use llm_policy_audit::commands::analyze::{analyze_command, AnalyzeArgs};
use llm_policy_audit::commands::artifacts::{fetch_command, models_command};
use llm_policy_audit::commands::report::report_command;
use llm_policy_audit::commands::rewrite::{rewrite_command, RewriteArgs};
use llm_policy_audit::config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "policy-audit")]
#[command(about = "Review policy documents against compliance controls with an LLM judge", long_about = None)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = "policy-audit.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge every control in a table against a policy document
    Analyze(AnalyzeArgs),

    /// Rewrite analyze suggestions into short action items
    Rewrite(RewriteArgs),

    /// Render a rewrite table into the report template
    Report {
        /// Rewrite output table, by artifact filename
        #[arg(long)]
        input: String,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the path of an artifact in the output store
    Fetch {
        /// Artifact filename
        filename: String,
    },

    /// List known models per backend
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Analyze(args) => analyze_command(&config, args).await,
        Commands::Rewrite(args) => rewrite_command(&config, args).await,
        Commands::Report { input, json } => report_command(&config, &input, json),
        Commands::Fetch { filename } => fetch_command(&config, &filename),
        Commands::Models { json } => models_command(json),
    }
}

//! Bidproof CLI entry point
//!
//! One-shot runner around the service API: analyze two text files and print
//! the run envelope, or inspect previously persisted runs.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use bidproof::{AnalysisService, AppConfig};
use bidproof_core::model::{AnalysisRequest, ExecutionMode};
use bidproof_llm::GeminiProvider;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bidproof", version, about = "Requirements coverage analysis with verified evidence")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a source/evidence pair, generate exports, persist the run
    Run {
        /// Requirements source text file
        source: PathBuf,
        /// Evidence text file
        evidence: PathBuf,
        /// Execution mode: live, cache, offline, or auto
        #[arg(long, default_value = "auto")]
        mode: String,
        /// Model override
        #[arg(long, default_value = "")]
        model: String,
        /// Skip the cache read and force a fresh computation
        #[arg(long)]
        bust_cache: bool,
        /// Provider API key
        #[arg(long, env = "GEMINI_API_KEY", default_value = "")]
        api_key: String,
    },
    /// Print a stored run bundle
    Show {
        /// Run identifier
        run_id: String,
    },
    /// List recent runs, newest first
    List {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_or_default(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Run {
            source,
            evidence,
            mode,
            model,
            bust_cache,
            api_key,
        } => {
            let mode: ExecutionMode = mode.parse()?;
            let source_text = fs::read_to_string(&source)
                .with_context(|| format!("reading {}", source.display()))?;
            let evidence_text = fs::read_to_string(&evidence)
                .with_context(|| format!("reading {}", evidence.display()))?;

            let provider = Arc::new(GeminiProvider::new(api_key, None));
            let service = AnalysisService::new(provider, config);

            let request = AnalysisRequest {
                source_text,
                evidence_text,
                model_requested: model,
                mode,
                bust_cache,
            };
            let outcome = service.run(&request).await;
            match outcome.response {
                Some(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                None => {
                    let retry = outcome.retry_after_seconds.unwrap_or(0);
                    bail!(
                        "request rejected with status {} (Retry-After: {}s): {}",
                        outcome.http_status,
                        retry,
                        outcome.warnings.join("; ")
                    );
                }
            }
        }
        Command::Show { run_id } => {
            let service = offline_service(config);
            let bundle = service.get_run(&run_id)?;
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        Command::List { limit } => {
            let service = offline_service(config);
            let runs = service.list_runs(limit);
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
    }

    Ok(())
}

/// Service stack without provider credentials, for read-only commands.
fn offline_service(config: AppConfig) -> AnalysisService {
    let provider = Arc::new(GeminiProvider::new("", None));
    AnalysisService::new(provider, config)
}

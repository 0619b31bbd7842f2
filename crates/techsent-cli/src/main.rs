mod analyze;
mod terms;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use analyze::AnalyzeArgs;

#[derive(Debug, Parser)]
#[command(name = "techsent-cli")]
#[command(about = "Technology-mention sentiment analysis for financial filings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find technology mentions in a filing and score each with FinBERT and an LLM
    Analyze(AnalyzeArgs),
    /// Print the normalized vocabulary with its variants
    Terms {
        /// Vocabulary file (`.csv` with a `technologies` column, or one term per line)
        #[arg(long)]
        vocabulary: PathBuf,

        /// YAML file of extra variants per term
        #[arg(long)]
        synonyms: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = techsent_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Analyze(args) => analyze::run_analyze(&config, &args).await?,
        Commands::Terms {
            vocabulary,
            synonyms,
        } => terms::run_terms(&vocabulary, synonyms.as_deref())?,
    }

    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the run simply
/// cannot be cancelled.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received ctrl-c, cancelling outstanding provider calls");
}

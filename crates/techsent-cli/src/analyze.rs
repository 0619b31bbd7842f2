//! `analyze` command handler.
//!
//! Loads the vocabulary and document, runs both providers over every mention
//! and renders the joined rows. Provider failures show up as `unavailable`
//! cells; only invalid inputs or missing credentials fail the command.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use techsent_core::AppConfig;
use techsent_sentiment::export::{render_json, render_markdown, summary_line, write_csv};
use techsent_sentiment::{
    extract_with, score_mentions, AnalysisReport, FinbertClient, OpenAiClient, PipelineOptions,
};

use crate::shutdown_signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Markdown,
    Json,
    Csv,
}

#[derive(Debug, Args)]
pub(crate) struct AnalyzeArgs {
    /// Plain-text filing to analyze
    #[arg(long)]
    pub document: PathBuf,

    /// Vocabulary file (`.csv` with a `technologies` column, or one term per line)
    #[arg(long)]
    pub vocabulary: PathBuf,

    /// YAML file of extra variants per term
    #[arg(long)]
    pub synonyms: Option<PathBuf>,

    /// Characters of context on each side of a mention (overrides `TECHSENT_CONTEXT_WINDOW`)
    #[arg(long)]
    pub window: Option<usize>,

    /// Keep only the earliest N mentions of each term
    #[arg(long, value_parser = parse_positive)]
    pub max_mentions_per_term: Option<usize>,

    /// Provider calls in flight at once (overrides `TECHSENT_MAX_CONCURRENT_REQUESTS`)
    #[arg(long, value_parser = parse_positive)]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// List mentions without calling any provider
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Merge CLI overrides over the environment configuration.
pub(crate) fn pipeline_options(config: &AppConfig, args: &AnalyzeArgs) -> PipelineOptions {
    let mut options = PipelineOptions::from_config(config);
    if let Some(window) = args.window {
        options.extract.window_size = window;
    }
    if let Some(cap) = args.max_mentions_per_term {
        options.extract.max_mentions_per_term = Some(cap);
    }
    if let Some(concurrency) = args.concurrency {
        options.max_concurrent_requests = concurrency;
    }
    options
}

/// Run the `analyze` command.
///
/// Inputs are validated by extracting mentions before anything else, so an
/// empty vocabulary or document is reported ahead of missing credentials.
/// When `dry_run` is `true`, prints the mentions that would be scored and
/// returns without building any provider client.
///
/// # Errors
///
/// Returns an error if an input file cannot be loaded, the vocabulary or
/// document is empty, `OPENAI_API_KEY` is unset, or the report cannot be
/// written.
pub(crate) async fn run_analyze(config: &AppConfig, args: &AnalyzeArgs) -> anyhow::Result<()> {
    let vocabulary = techsent_core::load_vocabulary(&args.vocabulary, args.synonyms.as_deref())
        .with_context(|| format!("failed to load vocabulary {}", args.vocabulary.display()))?;
    let document = techsent_core::load_document(&args.document)
        .with_context(|| format!("failed to load document {}", args.document.display()))?;
    let options = pipeline_options(config, args);
    let mentions = extract_with(&document, &vocabulary, &options.extract)?;

    if args.dry_run {
        println!(
            "dry-run: {} mentions of {} terms; no provider calls made",
            mentions.len(),
            vocabulary.len()
        );
        println!("{:<32}{:<16}MATCHED", "TERM", "OFFSET");
        for m in &mentions {
            println!(
                "{:<32}{:<16}{}",
                m.term,
                format!("{}..{}", m.start_offset, m.end_offset),
                m.matched
            );
        }
        return Ok(());
    }

    let api_key = config.openai_api_key.as_deref().ok_or_else(|| {
        anyhow::anyhow!("OPENAI_API_KEY is not set; use --dry-run to list mentions without scoring")
    })?;

    let financial = FinbertClient::new(&config.finbert_tei_url, config.request_timeout_secs)
        .context("failed to build FinBERT client")?
        .with_retries(config.max_retries, config.retry_backoff_base_ms);
    let llm = OpenAiClient::new(
        api_key,
        &config.openai_base_url,
        &config.openai_model,
        config.request_timeout_secs,
    )
    .context("failed to build OpenAI client")?
    .with_retries(config.max_retries, config.retry_backoff_base_ms);

    let report = score_mentions(
        mentions,
        options.max_concurrent_requests,
        &financial,
        &llm,
        shutdown_signal(),
    )
    .await;

    let rendered = render(&report, args)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), rows = report.rows.len(), "report written");
        }
        None => print!("{rendered}"),
    }

    if report.summary.failed_calls() > 0 {
        tracing::warn!(
            financial_unavailable = report.summary.financial_unavailable,
            llm_unavailable = report.summary.llm_unavailable,
            "some provider calls failed"
        );
    }
    eprintln!("{}", summary_line(&report.summary));
    Ok(())
}

fn render(report: &AnalysisReport, args: &AnalyzeArgs) -> anyhow::Result<String> {
    Ok(match args.format {
        OutputFormat::Markdown => render_markdown(
            &report.rows,
            &report.summary,
            &args.document.display().to_string(),
        ),
        OutputFormat::Json => {
            let mut json = render_json(&report.rows)?;
            json.push('\n');
            json
        }
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            write_csv(&report.rows, &mut buf)?;
            String::from_utf8(buf)?
        }
    })
}

//! Analysis pipeline orchestration.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use techsent_core::{AppConfig, Vocabulary};

use crate::aggregator::{aggregate, summarize, ResultMap};
use crate::error::ExtractError;
use crate::extractor::{extract_with, ExtractOptions};
use crate::providers::{score_mention, SentimentProvider};
use crate::types::{AnalysisRow, Mention, RunSummary, SentimentSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub extract: ExtractOptions,
    /// Upper bound on provider calls in flight at once.
    pub max_concurrent_requests: usize,
}

impl PipelineOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            extract: ExtractOptions {
                window_size: config.context_window,
                max_mentions_per_term: config.max_mentions_per_term,
            },
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub rows: Vec<AnalysisRow>,
    pub summary: RunSummary,
}

/// Run the full analysis over one document.
///
/// Extracts mentions (failing fast on an empty vocabulary or document), then
/// hands them to [`score_mentions`].
///
/// # Errors
///
/// Returns [`ExtractError`] if the inputs are invalid. No provider call is
/// made in that case.
pub async fn run_analysis<F, L, S>(
    document: &str,
    vocabulary: &Vocabulary,
    options: &PipelineOptions,
    financial: &F,
    llm: &L,
    shutdown: S,
) -> Result<AnalysisReport, ExtractError>
where
    F: SentimentProvider,
    L: SentimentProvider,
    S: Future<Output = ()>,
{
    let mentions = extract_with(document, vocabulary, &options.extract)?;
    Ok(score_mentions(mentions, options.max_concurrent_requests, financial, llm, shutdown).await)
}

/// Score already-extracted mentions with both providers and join the results.
///
/// At most `max_concurrent_requests` calls run at a time and each finished
/// call is recorded immediately. If `shutdown` resolves first, in-flight
/// calls are dropped and every unrecorded call shows up as `Unavailable`.
/// Provider failures never abort the run.
pub async fn score_mentions<F, L, S>(
    mentions: Vec<Mention>,
    max_concurrent_requests: usize,
    financial: &F,
    llm: &L,
    shutdown: S,
) -> AnalysisReport
where
    F: SentimentProvider,
    L: SentimentProvider,
    S: Future<Output = ()>,
{
    let max_concurrent = max_concurrent_requests.max(1);
    tracing::info!(mentions = mentions.len(), max_concurrent, "scoring mentions");

    let results: Mutex<ResultMap> = Mutex::new(ResultMap::new());

    let calls = mentions
        .iter()
        .flat_map(|m| SentimentSource::ALL.into_iter().map(move |s| (m, s)));

    let work = stream::iter(calls)
        .map(|(mention, source)| {
            let results = &results;
            async move {
                let result = match source {
                    SentimentSource::FinancialModel => score_mention(financial, mention).await,
                    SentimentSource::LanguageModelApi => score_mention(llm, mention).await,
                };
                results
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert((mention.key(), source), result);
            }
        })
        .buffer_unordered(max_concurrent)
        .for_each(|()| async {});

    let cancelled = tokio::select! {
        () = work => false,
        () = shutdown => {
            tracing::warn!("analysis cancelled; unfinished provider calls will be marked unavailable");
            true
        }
    };

    let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    let rows = aggregate(&mentions, &results);
    let summary = summarize(&rows, results.len(), cancelled);

    tracing::info!(
        mentions = summary.mentions,
        financial_unavailable = summary.financial_unavailable,
        llm_unavailable = summary.llm_unavailable,
        disagreements = summary.disagreements,
        cancelled = summary.cancelled,
        "analysis complete"
    );

    AnalysisReport { rows, summary }
}

//! Join mentions with both providers' results.

use std::collections::HashMap;

use crate::types::{AnalysisRow, Mention, MentionKey, RunSummary, SentimentResult, SentimentSource};

/// Provider results keyed by mention identity and source.
pub type ResultMap = HashMap<(MentionKey, SentimentSource), SentimentResult>;

/// `raw_response` used when a provider never recorded a result for a mention.
pub const NO_RESULT: &str = "no result recorded";

/// Build one row per mention, in mention order.
///
/// A missing result for either provider becomes an explicit `Unavailable`
/// marker; no mention is ever dropped. Disagreeing labels are kept as-is.
#[must_use]
pub fn aggregate(mentions: &[Mention], results: &ResultMap) -> Vec<AnalysisRow> {
    mentions
        .iter()
        .map(|mention| {
            let key = mention.key();
            let lookup = |source: SentimentSource| {
                results
                    .get(&(key.clone(), source))
                    .cloned()
                    .unwrap_or_else(|| SentimentResult::unavailable(source, NO_RESULT))
            };
            AnalysisRow {
                mention: mention.clone(),
                financial_sentiment: lookup(SentimentSource::FinancialModel),
                llm_sentiment: lookup(SentimentSource::LanguageModelApi),
            }
        })
        .collect()
}

/// Count failures and disagreements across `rows`.
///
/// `calls_recorded` is how many provider results were stored before
/// aggregation; the rest of the `2 * rows.len()` calls are reported missing.
#[must_use]
pub fn summarize(rows: &[AnalysisRow], calls_recorded: usize, cancelled: bool) -> RunSummary {
    let expected = rows.len() * SentimentSource::ALL.len();
    RunSummary {
        mentions: rows.len(),
        calls_recorded,
        calls_missing: expected.saturating_sub(calls_recorded),
        financial_unavailable: rows
            .iter()
            .filter(|r| !r.financial_sentiment.is_available())
            .count(),
        llm_unavailable: rows
            .iter()
            .filter(|r| !r.llm_sentiment.is_available())
            .count(),
        disagreements: rows.iter().filter(|r| r.disagreement()).count(),
        cancelled,
    }
}

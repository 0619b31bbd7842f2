//! Technology-mention sentiment analysis.
//!
//! Finds vocabulary terms in a filing, cuts a context window around each
//! mention, scores every window with FinBERT (via TEI) and an
//! OpenAI-compatible LLM, and joins both opinions into one row per mention.
//! Provider failures surface as `Unavailable` results, never as run errors.

pub mod aggregator;
pub mod error;
pub mod export;
pub mod extractor;
pub mod pipeline;
pub mod providers;
pub mod types;

mod retry;

pub use aggregator::{aggregate, summarize, ResultMap};
pub use error::{ExtractError, ProviderError};
pub use extractor::{extract, extract_with, ExtractOptions};
pub use pipeline::{run_analysis, score_mentions, AnalysisReport, PipelineOptions};
pub use providers::{score_mention, FinbertClient, OpenAiClient, SentimentProvider};
pub use types::{
    AnalysisRow, Mention, MentionKey, ProviderScore, RunSummary, SentimentLabel, SentimentResult,
    SentimentSource,
};

//! Sentiment provider abstraction.
//!
//! Both providers take the same context snippet and return one of the three
//! labels with a confidence. Callers depend only on [`SentimentProvider`].

mod finbert;
mod openai;

pub use finbert::FinbertClient;
pub use openai::OpenAiClient;

use std::future::Future;

use crate::error::ProviderError;
use crate::types::{Mention, ProviderScore, SentimentResult, SentimentSource};

/// A sentiment scorer for one context snippet.
pub trait SentimentProvider {
    /// Which column this provider fills.
    fn source(&self) -> SentimentSource;

    /// Score `text`, a context window around a mention of `term`.
    fn score(
        &self,
        text: &str,
        term: &str,
    ) -> impl Future<Output = Result<ProviderScore, ProviderError>> + Send;
}

/// Score one mention, turning any provider failure into an `Unavailable`
/// result. Never fails.
pub async fn score_mention<P>(provider: &P, mention: &Mention) -> SentimentResult
where
    P: SentimentProvider,
{
    let source = provider.source();
    match provider.score(&mention.context, &mention.term).await {
        Ok(score) => {
            tracing::debug!(
                term = %mention.term,
                offset = mention.start_offset,
                %source,
                label = %score.label,
                score = score.score,
                "mention scored"
            );
            SentimentResult::from_score(source, score)
        }
        Err(e) => {
            tracing::warn!(
                term = %mention.term,
                offset = mention.start_offset,
                %source,
                error = %e,
                "provider call failed; marking unavailable"
            );
            SentimentResult::unavailable(source, e.to_string())
        }
    }
}

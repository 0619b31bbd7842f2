use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which provider produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentSource {
    /// Pretrained financial-sentiment classifier (FinBERT).
    FinancialModel,
    /// General-purpose LLM chat-completions API.
    LanguageModelApi,
}

impl SentimentSource {
    pub const ALL: [SentimentSource; 2] = [Self::FinancialModel, Self::LanguageModelApi];
}

impl std::fmt::Display for SentimentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentSource::FinancialModel => write!(f, "financial_model"),
            SentimentSource::LanguageModelApi => write!(f, "language_model_api"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    /// The provider failed or never returned for this mention.
    Unavailable,
}

impl SentimentLabel {
    /// Parse one of the three provider labels, ignoring case and surrounding
    /// whitespace. `Unavailable` is never produced by parsing.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_available(self) -> bool {
        self != Self::Unavailable
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
            SentimentLabel::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// One located occurrence of a vocabulary term.
///
/// Offsets are UTF-8 byte offsets into the normalized document.
/// `context` is `document[context_start..context_end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Canonical term name.
    pub term: String,
    /// Document text that matched (one of the term's variants).
    pub matched: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub context_start: usize,
    pub context_end: usize,
    pub context: String,
}

impl Mention {
    #[must_use]
    pub fn key(&self) -> MentionKey {
        MentionKey {
            term: self.term.clone(),
            start_offset: self.start_offset,
        }
    }
}

/// Identity of a mention: a term never matches twice at the same offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MentionKey {
    pub term: String,
    pub start_offset: usize,
}

/// What a provider returns on success, before it is tagged with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderScore {
    pub label: SentimentLabel,
    /// Confidence in `label`, in `[0.0, 1.0]`.
    pub score: f32,
    pub raw_response: String,
    /// Extra qualitative fields (tone, intent, ...) some providers return.
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub source: SentimentSource,
    pub label: SentimentLabel,
    /// Confidence in `label`. `0.0` when unavailable.
    pub score: f32,
    /// Provider response body, or the error text when unavailable.
    pub raw_response: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl SentimentResult {
    #[must_use]
    pub fn from_score(source: SentimentSource, score: ProviderScore) -> Self {
        Self {
            source,
            label: score.label,
            score: score.score,
            raw_response: score.raw_response,
            details: score.details,
        }
    }

    #[must_use]
    pub fn unavailable(source: SentimentSource, reason: impl Into<String>) -> Self {
        Self {
            source,
            label: SentimentLabel::Unavailable,
            score: 0.0,
            raw_response: reason.into(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.label.is_available()
    }
}

/// Final per-mention record joining both providers' results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    pub mention: Mention,
    pub financial_sentiment: SentimentResult,
    pub llm_sentiment: SentimentResult,
}

impl AnalysisRow {
    /// Both providers returned a label and the labels match.
    ///
    /// `false` when either side is unavailable; disagreement is reported,
    /// never resolved.
    #[must_use]
    pub fn agreement(&self) -> bool {
        self.financial_sentiment.is_available()
            && self.financial_sentiment.label == self.llm_sentiment.label
    }

    /// Both providers returned a label and the labels differ.
    #[must_use]
    pub fn disagreement(&self) -> bool {
        self.financial_sentiment.is_available()
            && self.llm_sentiment.is_available()
            && self.financial_sentiment.label != self.llm_sentiment.label
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mentions: usize,
    /// Provider calls that recorded a result (successful or failed).
    pub calls_recorded: usize,
    /// Provider calls never recorded, e.g. because the run was cancelled.
    pub calls_missing: usize,
    pub financial_unavailable: usize,
    pub llm_unavailable: usize,
    pub disagreements: usize,
    pub cancelled: bool,
}

impl RunSummary {
    /// Total `Unavailable` markers across both providers.
    #[must_use]
    pub fn failed_calls(&self) -> usize {
        self.financial_unavailable + self.llm_unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parse_ignores_case_and_whitespace() {
        assert_eq!(SentimentLabel::parse(" Positive "), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::parse("NEGATIVE"), Some(SentimentLabel::Negative));
        assert_eq!(SentimentLabel::parse("neutral"), Some(SentimentLabel::Neutral));
    }

    #[test]
    fn label_parse_rejects_unknown_and_unavailable() {
        assert_eq!(SentimentLabel::parse("bullish"), None);
        assert_eq!(SentimentLabel::parse("unavailable"), None);
        assert_eq!(SentimentLabel::parse(""), None);
    }

    #[test]
    fn unavailable_result_carries_reason() {
        let result = SentimentResult::unavailable(SentimentSource::FinancialModel, "timeout");
        assert!(!result.is_available());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.raw_response, "timeout");
    }

    fn row(fin: SentimentLabel, llm: SentimentLabel) -> AnalysisRow {
        let result = |source, label| SentimentResult {
            source,
            label,
            score: 0.5,
            raw_response: String::new(),
            details: BTreeMap::new(),
        };
        AnalysisRow {
            mention: Mention {
                term: "AI".to_string(),
                matched: "AI".to_string(),
                start_offset: 0,
                end_offset: 2,
                context_start: 0,
                context_end: 2,
                context: "AI".to_string(),
            },
            financial_sentiment: result(SentimentSource::FinancialModel, fin),
            llm_sentiment: result(SentimentSource::LanguageModelApi, llm),
        }
    }

    #[test]
    fn agreement_requires_matching_available_labels() {
        use SentimentLabel::{Negative, Positive, Unavailable};
        assert!(row(Positive, Positive).agreement());
        assert!(!row(Positive, Negative).agreement());
        assert!(!row(Unavailable, Unavailable).agreement());
    }

    #[test]
    fn disagreement_ignores_unavailable_sides() {
        use SentimentLabel::{Negative, Positive, Unavailable};
        assert!(row(Positive, Negative).disagreement());
        assert!(!row(Positive, Unavailable).disagreement());
        assert!(!row(Positive, Positive).disagreement());
    }

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_string(&SentimentSource::LanguageModelApi).unwrap();
        assert_eq!(json, "\"language_model_api\"");
    }
}

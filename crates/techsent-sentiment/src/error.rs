use thiserror::Error;

/// Input validation failures. These abort a run before any provider call.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid vocabulary: no terms to search for")]
    InvalidVocabulary,

    #[error("document is empty or whitespace-only")]
    EmptyDocument,

    #[error("could not build pattern for term '{term}': {source}")]
    Pattern {
        term: String,
        #[source]
        source: regex::Error,
    },
}

/// Per-call provider failures. Never fatal to a run: the pipeline turns them
/// into `Unavailable` results.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

//! FinBERT classifier served by TEI (Text Embeddings Inference).
//!
//! TEI exposes sequence-classification models on `POST /predict`, returning
//! one `{label, score}` entry per class. The class with the highest
//! probability is the label.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SentimentProvider;
use crate::error::ProviderError;
use crate::retry::retry_with_backoff;
use crate::types::{ProviderScore, SentimentLabel, SentimentSource};

/// TEI HTTP client for a FinBERT deployment.
#[derive(Debug, Clone)]
pub struct FinbertClient {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: &'a str,
    raw_scores: bool,
    truncate: bool,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    label: String,
    score: f32,
}

/// TEI returns a flat list for a single input; some deployments wrap it once.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictResponse {
    Flat(Vec<Prediction>),
    Nested(Vec<Vec<Prediction>>),
}

impl FinbertClient {
    /// Create a client for the TEI server at `tei_url`.
    ///
    /// Retries are off until [`FinbertClient::with_retries`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(tei_url: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/predict", tei_url.trim_end_matches('/')),
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// One `/predict` round trip, returning the raw body.
    async fn predict(&self, text: &str) -> Result<String, ProviderError> {
        let request = PredictRequest {
            inputs: text,
            raw_scores: false,
            truncate: true,
        };
        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl SentimentProvider for FinbertClient {
    fn source(&self) -> SentimentSource {
        SentimentSource::FinancialModel
    }

    async fn score(&self, text: &str, _term: &str) -> Result<ProviderScore, ProviderError> {
        let body = retry_with_backoff("finbert", self.max_retries, self.backoff_base_ms, || {
            self.predict(text)
        })
        .await?;
        parse_predictions(&body)
    }
}

/// Pick the most probable class from a TEI `/predict` body.
///
/// # Errors
///
/// Returns [`ProviderError::MalformedResponse`] if the body is not a list of
/// predictions, is empty, or names a class other than positive, negative or
/// neutral.
pub(crate) fn parse_predictions(body: &str) -> Result<ProviderScore, ProviderError> {
    let parsed: PredictResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("TEI predict body: {e}")))?;

    let predictions = match parsed {
        PredictResponse::Flat(p) => p,
        PredictResponse::Nested(mut outer) => {
            if outer.len() > 1 {
                return Err(ProviderError::MalformedResponse(format!(
                    "expected predictions for one input, got {}",
                    outer.len()
                )));
            }
            outer.pop().unwrap_or_default()
        }
    };

    let mut probabilities = BTreeMap::new();
    let mut best: Option<(SentimentLabel, f32)> = None;
    for p in &predictions {
        let label = SentimentLabel::parse(&p.label).ok_or_else(|| {
            ProviderError::MalformedResponse(format!("unknown FinBERT class '{}'", p.label))
        })?;
        if !p.score.is_finite() {
            return Err(ProviderError::MalformedResponse(format!(
                "non-finite score for class '{}'",
                p.label
            )));
        }
        probabilities.insert(label.to_string(), format!("{:.4}", p.score));
        if best.is_none_or(|(_, s)| p.score > s) {
            best = Some((label, p.score));
        }
    }

    let (label, score) =
        best.ok_or_else(|| ProviderError::MalformedResponse("empty prediction list".to_owned()))?;

    Ok(ProviderScore {
        label,
        score: score.clamp(0.0, 1.0),
        raw_response: body.to_owned(),
        details: probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_probability_class() {
        let body = r#"[{"label":"positive","score":0.12},{"label":"negative","score":0.81},{"label":"neutral","score":0.07}]"#;
        let score = parse_predictions(body).unwrap();
        assert_eq!(score.label, SentimentLabel::Negative);
        assert!((score.score - 0.81).abs() < 1e-6);
        assert_eq!(score.raw_response, body);
        assert_eq!(score.details.get("negative").map(String::as_str), Some("0.8100"));
    }

    #[test]
    fn accepts_nested_single_input_response() {
        let body = r#"[[{"label":"Neutral","score":0.9},{"label":"Positive","score":0.1}]]"#;
        let score = parse_predictions(body).unwrap();
        assert_eq!(score.label, SentimentLabel::Neutral);
    }

    #[test]
    fn first_class_wins_exact_tie() {
        let body = r#"[{"label":"positive","score":0.5},{"label":"neutral","score":0.5}]"#;
        let score = parse_predictions(body).unwrap();
        assert_eq!(score.label, SentimentLabel::Positive);
    }

    #[test]
    fn empty_list_is_malformed() {
        assert!(matches!(
            parse_predictions("[]"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unknown_label_is_malformed() {
        let body = r#"[{"label":"LABEL_0","score":0.9}]"#;
        assert!(matches!(
            parse_predictions(body),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_predictions("<html>bad gateway</html>"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn predict_url_strips_trailing_slash() {
        let client = FinbertClient::new("http://localhost:8080/", 5).unwrap();
        assert_eq!(client.url, "http://localhost:8080/predict");
    }
}

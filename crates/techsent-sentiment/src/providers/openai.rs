//! OpenAI-compatible chat-completions sentiment scorer.
//!
//! The model is asked for a JSON object with a three-way `sentiment` label,
//! a numeric `confidence`, and a few qualitative fields describing the
//! passage. JSON mode is requested, but replies wrapped in Markdown fences
//! are still accepted.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use super::SentimentProvider;
use crate::error::ProviderError;
use crate::retry::retry_with_backoff;
use crate::types::{ProviderScore, SentimentLabel, SentimentSource};

const SYSTEM_PROMPT: &str = "You are a financial analyst who classifies the sentiment \
of passages from company filings toward a named technology. Reply with a single JSON \
object and nothing else.";

/// Qualitative fields copied into `details`, each with the reply keys that
/// may carry it. Older prompts asked for `ToneAndStyle` instead of `tone`.
const DETAIL_FIELDS: &[(&str, &[&str])] = &[
    ("tone", &["tone", "tone_and_style", "ToneAndStyle"]),
    ("emotion", &["emotion"]),
    ("intent", &["intent"]),
    ("stance", &["stance"]),
];

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiClient {
    /// Create a client for the chat-completions API under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
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

    /// One chat-completions round trip, returning the assistant message.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": &self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ]
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("chat response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("no message content".to_owned()))
    }
}

impl SentimentProvider for OpenAiClient {
    fn source(&self) -> SentimentSource {
        SentimentSource::LanguageModelApi
    }

    async fn score(&self, text: &str, term: &str) -> Result<ProviderScore, ProviderError> {
        let prompt = build_prompt(term, text);
        let content = retry_with_backoff("openai", self.max_retries, self.backoff_base_ms, || {
            self.complete(&prompt)
        })
        .await?;
        parse_sentiment_reply(&content)
    }
}

fn build_prompt(term: &str, text: &str) -> String {
    format!(
        "Analyze the following text from a financial report related to \"{term}\".\n\
         The text is: \"{text}\"\n\
         Provide a JSON object with:\n\
         \"sentiment\": exactly one of \"Positive\", \"Negative\" or \"Neutral\",\n\
         \"confidence\": a number between 0 and 1,\n\
         \"tone\": one of \"Formal\", \"Cautious\", \"Informative\",\n\
         \"emotion\": one of \"Confident\", \"Concern\", \"Neutral\",\n\
         \"intent\": a short description of the passage's purpose (e.g. risk disclosure, performance summary),\n\
         \"stance\": one of \"Agreement\", \"Contradiction\", \"Neutrality\"."
    )
}

/// Strip Markdown code fences and keep the outermost `{...}`.
fn extract_json(reply: &str) -> &str {
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned,
    }
}

/// Case-insensitive field lookup; models drift between `sentiment` and `Sentiment`.
fn field<'a>(
    object: &'a serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Option<&'a serde_json::Value> {
    object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

/// Parse the assistant's JSON reply into a score.
///
/// A missing `confidence` counts as 1.0. Out-of-range confidences are clamped.
///
/// # Errors
///
/// Returns [`ProviderError::MalformedResponse`] if the reply is not a JSON
/// object, has no `sentiment`, or the label is not one of the three allowed.
pub(crate) fn parse_sentiment_reply(reply: &str) -> Result<ProviderScore, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(extract_json(reply))
        .map_err(|e| ProviderError::MalformedResponse(format!("LLM reply is not JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| ProviderError::MalformedResponse("LLM reply is not an object".to_owned()))?;

    let raw_label = field(object, "sentiment")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ProviderError::MalformedResponse("missing `sentiment` field".to_owned()))?;
    let label = SentimentLabel::parse(raw_label).ok_or_else(|| {
        ProviderError::MalformedResponse(format!("unknown sentiment label '{raw_label}'"))
    })?;

    let confidence = match field(object, "confidence") {
        None | Some(serde_json::Value::Null) => 1.0,
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(1.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            ProviderError::MalformedResponse(format!("confidence '{s}' is not a number"))
        })?,
        Some(other) => {
            return Err(ProviderError::MalformedResponse(format!(
                "confidence {other} is not a number"
            )))
        }
    };

    let details: BTreeMap<String, String> = DETAIL_FIELDS
        .iter()
        .filter_map(|&(name, keys)| {
            keys.iter()
                .find_map(|key| field(object, key).and_then(serde_json::Value::as_str))
                .map(|v| (name.to_owned(), v.to_owned()))
        })
        .collect();

    #[allow(clippy::cast_possible_truncation)]
    let score = confidence.clamp(0.0, 1.0) as f32;

    Ok(ProviderScore {
        label,
        score,
        raw_response: reply.to_owned(),
        details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_reply() {
        let reply = r#"{"sentiment":"Positive","confidence":0.82,"tone":"Formal","intent":"performance summary"}"#;
        let score = parse_sentiment_reply(reply).unwrap();
        assert_eq!(score.label, SentimentLabel::Positive);
        assert!((score.score - 0.82).abs() < 1e-6);
        assert_eq!(score.details.get("tone").map(String::as_str), Some("Formal"));
        assert_eq!(
            score.details.get("intent").map(String::as_str),
            Some("performance summary")
        );
        assert_eq!(score.raw_response, reply);
    }

    #[test]
    fn accepts_capitalized_keys() {
        let reply = r#"{"Sentiment":"Negative","ToneAndStyle":"Cautious","Stance":"Neutrality"}"#;
        let score = parse_sentiment_reply(reply).unwrap();
        assert_eq!(score.label, SentimentLabel::Negative);
        assert!((score.score - 1.0).abs() < 1e-6, "missing confidence defaults to 1.0");
        assert_eq!(score.details.get("stance").map(String::as_str), Some("Neutrality"));
        assert_eq!(score.details.get("tone").map(String::as_str), Some("Cautious"));
    }

    #[test]
    fn plain_tone_key_wins_over_alias() {
        let reply = r#"{"sentiment":"Neutral","tone":"Formal","ToneAndStyle":"Cautious"}"#;
        let score = parse_sentiment_reply(reply).unwrap();
        assert_eq!(score.details.get("tone").map(String::as_str), Some("Formal"));
    }

    #[test]
    fn strips_markdown_fences() {
        let reply = "```json\n{\"sentiment\": \"neutral\", \"confidence\": \"0.4\"}\n```";
        let score = parse_sentiment_reply(reply).unwrap();
        assert_eq!(score.label, SentimentLabel::Neutral);
        assert!((score.score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn clamps_confidence() {
        let score = parse_sentiment_reply(r#"{"sentiment":"positive","confidence":1.7}"#).unwrap();
        assert!((score.score - 1.0).abs() < 1e-6);
        let score = parse_sentiment_reply(r#"{"sentiment":"positive","confidence":-3}"#).unwrap();
        assert!(score.score.abs() < 1e-6);
    }

    #[test]
    fn unknown_label_is_malformed() {
        let result = parse_sentiment_reply(r#"{"sentiment":"Bullish","confidence":0.9}"#);
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn missing_label_is_malformed() {
        let result = parse_sentiment_reply(r#"{"confidence":0.9}"#);
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn prose_reply_is_malformed() {
        let result = parse_sentiment_reply("The sentiment is positive.");
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn non_numeric_confidence_is_malformed() {
        let result = parse_sentiment_reply(r#"{"sentiment":"Neutral","confidence":"high"}"#);
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn prompt_names_term_and_embeds_text() {
        let prompt = build_prompt("cloud computing", "iCloud revenue grew.");
        assert!(prompt.contains("\"cloud computing\""));
        assert!(prompt.contains("iCloud revenue grew."));
        assert!(prompt.contains("\"Positive\", \"Negative\" or \"Neutral\""));
    }

    #[test]
    fn completions_url_strips_trailing_slash() {
        let client = OpenAiClient::new("k", "https://api.openai.com/v1/", "gpt-4o", 5).unwrap();
        assert_eq!(client.url, "https://api.openai.com/v1/chat/completions");
    }
}

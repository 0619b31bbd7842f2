//! Integration tests for the FinBERT and OpenAI clients using wiremock HTTP mocks.

use techsent_sentiment::{
    FinbertClient, OpenAiClient, ProviderError, SentimentLabel, SentimentProvider, SentimentSource,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn finbert(base_url: &str) -> FinbertClient {
    FinbertClient::new(base_url, 5)
        .expect("client construction should not fail")
        .with_retries(2, 0)
}

fn openai(base_url: &str) -> OpenAiClient {
    OpenAiClient::new("test-key", base_url, "gpt-4o-mini", 5)
        .expect("client construction should not fail")
        .with_retries(2, 0)
}

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
async fn finbert_returns_top_class() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_partial_json(serde_json::json!({
            "inputs": "AI spending may pressure margins.",
            "truncate": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "label": "negative", "score": 0.71 },
            { "label": "neutral", "score": 0.22 },
            { "label": "positive", "score": 0.07 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = finbert(&server.uri());
    assert_eq!(client.source(), SentimentSource::FinancialModel);

    let score = client
        .score("AI spending may pressure margins.", "AI")
        .await
        .expect("should parse prediction");
    assert_eq!(score.label, SentimentLabel::Negative);
    assert!((score.score - 0.71).abs() < 1e-6);
    assert_eq!(score.details.len(), 3);
}

#[tokio::test]
async fn finbert_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "label": "positive", "score": 0.93 }
        ])))
        .mount(&server)
        .await;

    let score = finbert(&server.uri())
        .score("Cloud revenue grew 20%.", "cloud")
        .await
        .expect("second attempt should succeed");
    assert_eq!(score.label, SentimentLabel::Positive);
}

#[tokio::test]
async fn finbert_gives_up_after_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = finbert(&server.uri())
        .score("text", "AI")
        .await
        .expect_err("all attempts fail");
    assert!(matches!(err, ProviderError::Status { status: 500, .. }));
}

#[tokio::test]
async fn finbert_malformed_body_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "unexpected"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = finbert(&server.uri())
        .score("text", "AI")
        .await
        .expect_err("body is not a prediction list");
    assert!(matches!(err, ProviderError::MalformedResponse(_)));
}

#[tokio::test]
async fn openai_sends_bearer_token_and_parses_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
            r#"{"sentiment":"Positive","confidence":0.88,"tone":"Formal","stance":"Agreement"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = openai(&server.uri());
    assert_eq!(client.source(), SentimentSource::LanguageModelApi);

    let score = client
        .score("We expanded our AI platform.", "AI")
        .await
        .expect("should parse reply");
    assert_eq!(score.label, SentimentLabel::Positive);
    assert!((score.score - 0.88).abs() < 1e-6);
    assert_eq!(score.details.get("tone").map(String::as_str), Some("Formal"));
}

#[tokio::test]
async fn openai_rejects_prose_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("I think the sentiment is mostly positive.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = openai(&server.uri())
        .score("text", "AI")
        .await
        .expect_err("prose is not JSON");
    assert!(matches!(err, ProviderError::MalformedResponse(_)));
}

#[tokio::test]
async fn openai_auth_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = openai(&server.uri())
        .score("text", "AI")
        .await
        .expect_err("401 is fatal for the call");
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn openai_rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply(r#"{"sentiment":"neutral","confidence":0.6}"#)),
        )
        .mount(&server)
        .await;

    let score = openai(&server.uri())
        .score("text", "AI")
        .await
        .expect("third attempt should succeed");
    assert_eq!(score.label, SentimentLabel::Neutral);
}

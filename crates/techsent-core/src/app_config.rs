#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Characters of context kept on each side of a mention.
    pub context_window: usize,
    /// Keep at most this many mentions per term (earliest first). `None` keeps all.
    pub max_mentions_per_term: Option<usize>,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub finbert_tei_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("context_window", &self.context_window)
            .field("max_mentions_per_term", &self.max_mentions_per_term)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("finbert_tei_url", &self.finbert_tei_url)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .finish()
    }
}

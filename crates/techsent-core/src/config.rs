use crate::app_config::AppConfig;
use crate::ConfigError;

/// Default context window in characters on each side of a mention.
pub const DEFAULT_CONTEXT_WINDOW: &str = "500";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let log_level = or_default("TECHSENT_LOG_LEVEL", "info");

    let context_window = parse_usize("TECHSENT_CONTEXT_WINDOW", DEFAULT_CONTEXT_WINDOW)?;

    let max_mentions_per_term = match lookup("TECHSENT_MAX_MENTIONS_PER_TERM") {
        Ok(raw) if !raw.trim().is_empty() => {
            let cap = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid("TECHSENT_MAX_MENTIONS_PER_TERM", e.to_string()))?;
            if cap == 0 {
                return Err(invalid(
                    "TECHSENT_MAX_MENTIONS_PER_TERM",
                    "must be at least 1".to_string(),
                ));
            }
            Some(cap)
        }
        _ => None,
    };

    let max_concurrent_requests = parse_usize("TECHSENT_MAX_CONCURRENT_REQUESTS", "4")?.max(1);
    let request_timeout_secs = parse_u64("TECHSENT_REQUEST_TIMEOUT_SECS", "60")?;
    let max_retries = parse_u32("TECHSENT_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("TECHSENT_RETRY_BACKOFF_BASE_MS", "1000")?;

    let finbert_tei_url = or_default("FINBERT_TEI_URL", "http://localhost:8080");
    let openai_api_key = lookup("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let openai_base_url = or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
    let openai_model = or_default("OPENAI_MODEL", "gpt-4o");

    Ok(AppConfig {
        log_level,
        context_window,
        max_mentions_per_term,
        max_concurrent_requests,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        finbert_tei_url,
        openai_api_key,
        openai_base_url,
        openai_model,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

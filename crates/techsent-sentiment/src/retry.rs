//! Retry with exponential back-off and jitter for provider calls.
//!
//! [`retry_with_backoff`] wraps a fallible provider request and retries on
//! transient errors (network failures, 429, 5xx). Malformed responses and
//! other client errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connect failures, HTTP 429 and 5xx.
///
/// **Not retriable:** [`ProviderError::MalformedResponse`] and any other
/// HTTP status; retrying would get the same answer.
pub(crate) fn is_retriable(err: &ProviderError) -> bool {
    match err {
        ProviderError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
        ProviderError::MalformedResponse(_) => false,
    }
}

const MAX_DELAY: Duration = Duration::from_secs(60);

/// Delay before retry number `retry` (1-based): `base_ms * 2^(retry-1)`,
/// capped at [`MAX_DELAY`], then jittered by a factor in `0.75..=1.25`.
fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    let nominal = Duration::from_millis(base_ms.saturating_mul(1 << exponent)).min(MAX_DELAY);
    nominal.mul_f64(rand::random_range(0.75..=1.25))
}

/// Calls `operation`, retrying transient failures up to `max_retries` times.
///
/// The last error is returned once retries run out or a non-retriable error
/// comes back.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    provider: &'static str,
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut retries = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if retries < max_retries && is_retriable(&err) => err,
            Err(err) => return Err(err),
        };
        retries += 1;
        let delay = backoff_delay(backoff_base_ms, retries);
        tracing::warn!(
            retry = retries,
            of = max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "{provider} call failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    fn unavailable() -> ProviderError {
        ProviderError::Status {
            status: 503,
            body: "overloaded".to_owned(),
        }
    }

    #[test]
    fn server_errors_and_rate_limits_are_retriable() {
        assert!(is_retriable(&unavailable()));
        assert!(is_retriable(&ProviderError::Status {
            status: 429,
            body: String::new()
        }));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&ProviderError::Status {
            status: 401,
            body: "bad key".to_owned()
        }));
    }

    #[test]
    fn malformed_response_is_not_retriable() {
        assert!(!is_retriable(&ProviderError::MalformedResponse(
            "no label".to_owned()
        )));
    }

    /// Runs `retry_with_backoff` with zero base delay over a scripted
    /// sequence of outcomes; returns the result and how many calls were made.
    async fn run_script(
        max_retries: u32,
        script: Vec<Result<u32, ProviderError>>,
    ) -> (Result<u32, ProviderError>, u32) {
        let calls = AtomicU32::new(0);
        let script = Mutex::new(script.into_iter());
        let result = retry_with_backoff("finbert", max_retries, 0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            let next = script.lock().unwrap().next().expect("script exhausted");
            async move { next }
        })
        .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn first_success_makes_one_call() {
        let (result, calls) = run_script(3, vec![Ok(42)]).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let (result, calls) = run_script(3, vec![Err(unavailable()), Err(unavailable()), Ok(99)]).await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls, 3, "two failures then one success");
    }

    #[tokio::test]
    async fn last_error_returned_when_retries_run_out() {
        let rate_limited = ProviderError::Status {
            status: 429,
            body: "slow down".to_owned(),
        };
        let (result, calls) =
            run_script(2, vec![Err(unavailable()), Err(unavailable()), Err(rate_limited)]).await;
        assert_eq!(calls, 3);
        assert!(matches!(result, Err(ProviderError::Status { status: 429, .. })));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let (result, calls) = run_script(0, vec![Err(unavailable())]).await;
        assert_eq!(calls, 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn malformed_response_stops_immediately() {
        let (result, calls) =
            run_script(3, vec![Err(ProviderError::MalformedResponse("garbage".to_owned()))]).await;
        assert_eq!(calls, 1, "malformed responses are final");
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn backoff_doubles_within_jitter_bounds() {
        for _ in 0..50 {
            let first = backoff_delay(1000, 1);
            assert!((750..=1250).contains(&first.as_millis()), "{first:?}");
            let third = backoff_delay(1000, 3);
            assert!((3000..=5000).contains(&third.as_millis()), "{third:?}");
        }
    }

    #[test]
    fn backoff_is_capped() {
        for retry in [7, 20, u32::MAX] {
            let delay = backoff_delay(1000, retry);
            assert!(delay <= MAX_DELAY.mul_f64(1.25), "retry {retry}: {delay:?}");
            assert!(delay >= MAX_DELAY.mul_f64(0.75), "retry {retry}: {delay:?}");
        }
        assert_eq!(backoff_delay(0, 5), Duration::ZERO);
    }
}

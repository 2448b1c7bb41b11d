//! Shared HTTP send loop for the vendor clients
//!
//! Retries transient failures with exponential backoff; rate limits are
//! returned to the caller immediately with the server's retry-after hint.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use super::LlmError;

/// Maximum number of retries for transient errors
pub(crate) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub(crate) const INITIAL_BACKOFF_MS: u64 = 1000;

/// Backoff before the given (1-based) retry attempt
pub(crate) fn backoff_for(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1)))
}

/// Send a request built by `build`, retrying transient failures
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed by `send`.
pub(crate) async fn send_with_retry<F>(build: F, timeout: Duration, vendor: &str) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    debug!(%vendor, "send_with_retry: called");
    let mut last_error = None;

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = backoff_for(attempt);
            warn!(
                %vendor,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "send_with_retry: retrying after transient error"
            );
            tokio::time::sleep(backoff).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                debug!(attempt, "send_with_retry: request timed out");
                last_error = Some(LlmError::Timeout(timeout));
                continue;
            }
            Err(e) => {
                debug!(attempt, error = %e, "send_with_retry: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!("send_with_retry: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = LlmError::Status { status, body };
            if err.is_retryable() && attempt < MAX_RETRIES {
                debug!(attempt, status, "send_with_retry: retryable status");
                last_error = Some(err);
                continue;
            }
            debug!(%status, "send_with_retry: provider error");
            return Err(err);
        }

        debug!("send_with_retry: success");
        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| LlmError::Malformed("retries exhausted".to_string())))
}

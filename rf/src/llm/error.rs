//! Transport errors for the vendor clients

use std::time::Duration;
use thiserror::Error;

/// Failure talking to an LLM vendor
///
/// Messages may echo vendor response bodies; the provider layer sanitizes
/// them before they reach users.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Provider rate limit reached, retry in {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not reach provider: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("No response within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Could not encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Config(String),
}

impl LlmError {
    /// Whether the send loop may try the same request again
    ///
    /// Rate limits are excluded: the caller sees the retry-after hint instead.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Status { status, .. } => *status >= 500 || *status == 408,
            LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::RateLimited { .. } | LlmError::Malformed(_) | LlmError::Json(_) | LlmError::Config(_) => false,
        }
    }

    /// Missing credentials, unknown provider, or similar; nothing was sent
    pub fn is_config(&self) -> bool {
        matches!(self, LlmError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> LlmError {
        LlmError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(status(503).is_retryable());
        assert!(status(408).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(
            !LlmError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
            .is_retryable()
        );
        assert!(!LlmError::Malformed("no content".to_string()).is_retryable());
    }

    #[test]
    fn test_messages_do_not_name_vendors() {
        let rate = LlmError::RateLimited {
            retry_after: Duration::from_secs(12),
        };
        assert_eq!(rate.to_string(), "Provider rate limit reached, retry in 12s");
        assert_eq!(
            LlmError::Timeout(Duration::from_millis(1500)).to_string(),
            "No response within 1500ms"
        );
        assert_eq!(status(502).to_string(), "Provider returned HTTP 502: ");
    }

    #[test]
    fn test_config_message_is_passed_through() {
        let err = LlmError::Config("Set the GEMINI_API_KEY environment variable.".to_string());
        assert!(err.is_config());
        assert_eq!(err.to_string(), "Set the GEMINI_API_KEY environment variable.");
        assert!(!status(500).is_config());
    }
}

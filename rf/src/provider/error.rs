//! Provider error type

use thiserror::Error;

use super::sanitize::sanitize_message;
use crate::llm::LlmError;

/// Vendor-neutral failure of a provider call
///
/// The message is sanitized on construction and safe to show to users.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self {
            message: sanitize_message(raw.as_ref()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LlmError> for ProviderError {
    fn from(e: LlmError) -> Self {
        ProviderError::new(e.to_string())
    }
}

impl From<eyre::Report> for ProviderError {
    fn from(e: eyre::Report) -> Self {
        ProviderError::new(e.to_string())
    }
}

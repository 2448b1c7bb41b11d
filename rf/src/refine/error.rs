//! Refinement error types

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors surfaced by the refinement and tweak orchestrators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefineError {
    /// Provider could not be constructed (unknown id, missing key, bad config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A provider call failed; the message is already sanitized
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Caller input was rejected before any provider call
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RefineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, RefineError::Validation(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, RefineError::Provider(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, RefineError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RefineError::Validation("Answer required for: Who is the target audience?".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: Answer required for: Who is the target audience?"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_from_provider_error() {
        let err: RefineError = ProviderError::new("upstream exploded").into();
        assert!(err.is_provider());
        assert_eq!(err.to_string(), "Provider error: upstream exploded");
    }
}

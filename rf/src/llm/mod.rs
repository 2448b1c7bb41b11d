//! LLM transport for Refinery
//!
//! One `LlmClient` implementation per vendor API, plus the factory that picks
//! one from a resolved provider/model configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod gemini;
mod http;
mod openai;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};

use crate::config::ResolvedLlmConfig;

/// The closed set of supported vendor backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Anthropic, ProviderKind::OpenAi, ProviderKind::Gemini];

    /// Identifier used in config files and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "ProviderKind::from_str: called");
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => {
                debug!(provider = %other, "ProviderKind::from_str: unknown provider");
                Err(LlmError::Config(format!(
                    "Unknown LLM provider: '{}'. Supported: anthropic, openai, gemini",
                    other
                )))
            }
        }
    }
}

/// Create an LLM client from a resolved configuration
pub fn create_client_from_resolved(config: &ResolvedLlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client_from_resolved: called");
    match config.provider.parse::<ProviderKind>()? {
        ProviderKind::Anthropic => {
            debug!("create_client_from_resolved: creating Anthropic client");
            Ok(Arc::new(AnthropicClient::from_config(config)?))
        }
        ProviderKind::OpenAi => {
            debug!("create_client_from_resolved: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        ProviderKind::Gemini => {
            debug!("create_client_from_resolved: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
    }
}

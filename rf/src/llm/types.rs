//! LLM request/response types
//!
//! Provider-agnostic shapes; each client translates to and from its vendor's
//! wire format.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instruction
    pub system_prompt: String,

    /// User messages (a single one for every refinery call)
    pub messages: Vec<Message>,

    /// Max tokens for response, capped by the client's configured limit
    pub max_tokens: u32,

    /// Ask the vendor for a JSON response where it supports doing so
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Single-message request, the shape every refinery call uses
    pub fn single(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        debug!(%max_tokens, "CompletionRequest::single: called");
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(user)],
            max_tokens,
            json_mode: false,
        }
    }

    /// Request a JSON response
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        debug!("Message::assistant: called");
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Token usage, when the vendor reported it
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Response carrying text and no usage report
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            usage: None,
        }
    }
}

/// Token counts reported by the provider for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl TokenUsage {
    /// Build from input/output counts when the vendor reports no total
    pub fn from_counts(input: u64, output: u64) -> Self {
        debug!(%input, %output, "TokenUsage::from_counts: called");
        Self {
            input,
            output,
            total: input + output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_message_assistant() {
        let msg = Message::assistant("Hi there");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_single_request() {
        let req = CompletionRequest::single("system", "user text", 500);
        assert_eq!(req.system_prompt, "system");
        assert_eq!(req.messages, vec![Message::user("user text")]);
        assert_eq!(req.max_tokens, 500);
        assert!(!req.json_mode);
        assert!(req.with_json_mode().json_mode);
    }

    #[test]
    fn test_token_usage_from_counts() {
        let usage = TokenUsage::from_counts(120, 30);
        assert_eq!(usage.total, 150);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}

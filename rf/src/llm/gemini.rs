//! Google Gemini API client implementation
//!
//! Implements the LlmClient trait for the Gemini `generateContent` REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::send_with_retry;
use super::types::Role;
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, TokenUsage};
use crate::config::ResolvedLlmConfig;

/// Google Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from resolved configuration
    pub fn from_config(config: &ResolvedLlmConfig) -> Result<Self, LlmError> {
        debug!(?config, "from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        let mut generation_config = serde_json::json!({
            "maxOutputTokens": request.max_tokens.min(self.max_tokens),
        });
        if request.json_mode {
            debug!("build_request_body: json_mode enabled");
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": self.convert_messages(&request.messages),
            "generationConfig": generation_config,
        })
    }

    /// Convert internal Message types to Gemini `contents`
    fn convert_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        debug!(message_count = %messages.len(), "convert_messages: called");
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": msg.content }],
                })
            })
            .collect()
    }

    /// Parse the Gemini API response
    fn parse_response(&self, api_response: GeminiResponse) -> Result<CompletionResponse, LlmError> {
        debug!(candidate_count = api_response.candidates.len(), "parse_response: called");
        let text: String = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            debug!("parse_response: no text in first candidate");
            return Err(LlmError::Malformed(
                "Gemini response did not include text content".to_string(),
            ));
        }

        let usage = api_response.usage_metadata.and_then(|u| match (u.prompt_token_count, u.candidates_token_count) {
            (Some(input), Some(output)) => Some(TokenUsage {
                input,
                output,
                total: u.total_token_count.unwrap_or(input + output),
            }),
            _ => None,
        });

        Ok(CompletionResponse {
            content: Some(text),
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = self.endpoint();
        let body = self.build_request_body(&request);

        let response = send_with_retry(
            || {
                self.http
                    .post(url.clone())
                    .header("x-goog-api-key", self.api_key.clone())
                    .header("content-type", "application/json")
                    .json(&body)
            },
            self.timeout,
            "gemini",
        )
        .await?;

        let api_response: GeminiResponse = response.json().await?;
        self.parse_response(api_response)
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

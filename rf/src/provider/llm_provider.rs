//! Provider backed by an `LlmClient`
//!
//! Every vendor shares this implementation; only the transport differs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::payload::{answer_lines, parse_classification, parse_question_set};
use super::{Provider, ProviderError};
use crate::llm::{CompletionRequest, LlmClient, TokenUsage};
use crate::prompts::{PromptKind, PromptLoader, QuestionsPayload, RefinePayload, TweakPayload};
use crate::refine::{
    AnswerSet, Lineage, QuestionKeyMapping, QuestionSet, RefinedPrompt, TaskClassification, static_question_set,
};

/// Response budget for classification
pub const CLASSIFY_MAX_TOKENS: u32 = 256;

/// Response budget for question generation
pub const QUESTIONS_MAX_TOKENS: u32 = 2000;

/// Response budget for refinement
pub const REFINE_MAX_TOKENS: u32 = 4000;

/// Response budget for tweaks
pub const TWEAK_MAX_TOKENS: u32 = 2000;

/// Provider that renders payloads, calls an LLM and normalizes the result
pub struct LlmProvider {
    name: String,
    client: Arc<dyn LlmClient>,
    prompts: PromptLoader,
}

impl LlmProvider {
    pub fn new(name: impl Into<String>, client: Arc<dyn LlmClient>, prompts: PromptLoader) -> Self {
        let name = name.into();
        debug!(%name, "LlmProvider::new: called");
        Self { name, client, prompts }
    }

    /// One completion call; returns the trimmed text and usage
    async fn call(
        &self,
        kind: PromptKind,
        user: String,
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<(String, Option<TokenUsage>), ProviderError> {
        debug!(provider = %self.name, %kind, %max_tokens, %json_mode, "LlmProvider::call: called");
        let system = self.prompts.system_instruction(kind)?;

        let mut request = CompletionRequest::single(system, user, max_tokens);
        if json_mode {
            request = request.with_json_mode();
        }

        let response = self.client.complete(request).await?;
        let text = response.content.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            debug!(%kind, "LlmProvider::call: empty response");
            return Err(ProviderError::new(format!("{} returned an empty response", self.name)));
        }

        Ok((text.to_string(), response.usage))
    }
}

#[async_trait]
impl Provider for LlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify_task(&self, prompt: &str) -> TaskClassification {
        debug!(prompt_len = prompt.len(), "LlmProvider::classify_task: called");
        match self
            .call(PromptKind::Classification, prompt.to_string(), CLASSIFY_MAX_TOKENS, true)
            .await
        {
            Ok((text, _)) => match parse_classification(&text) {
                Some(classification) => {
                    info!(task_type = %classification.task_type, "Classified prompt");
                    classification
                }
                None => {
                    warn!(provider = %self.name, "classify_task: ambiguous classifier output, assuming generation");
                    TaskClassification::fallback()
                }
            },
            Err(e) => {
                warn!(provider = %self.name, error = %e, "classify_task: classification failed, assuming generation");
                TaskClassification::fallback()
            }
        }
    }

    async fn generate_questions(&self, prompt: &str, classification: &TaskClassification) -> QuestionSet {
        debug!(prompt_len = prompt.len(), task_type = %classification.task_type, "LlmProvider::generate_questions: called");
        let payload = match self.prompts.questions_payload(&QuestionsPayload {
            prompt: prompt.to_string(),
            task_type: classification.task_type.to_string(),
        }) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "generate_questions: payload render failed, using static questions");
                return static_question_set();
            }
        };

        let result = match self
            .call(PromptKind::Clarification, payload, QUESTIONS_MAX_TOKENS, true)
            .await
        {
            Ok((text, _)) => parse_question_set(&text, classification),
            Err(e) => Err(e),
        };

        match result {
            Ok(set) => {
                info!(question_count = set.len(), "Generated clarifying questions");
                set
            }
            Err(e) => {
                warn!(provider = %self.name, error = %e, "generate_questions: falling back to static questions");
                static_question_set()
            }
        }
    }

    async fn refine_with_answers(
        &self,
        prompt: &str,
        answers: &AnswerSet,
        mapping: &QuestionKeyMapping,
    ) -> Result<RefinedPrompt, ProviderError> {
        debug!(prompt_len = prompt.len(), answer_count = answers.len(), "LlmProvider::refine_with_answers: called");
        let lines = answer_lines(answers, mapping);
        let payload = self.prompts.refine_payload(&RefinePayload::new(prompt, &lines))?;

        let (text, usage) = self
            .call(PromptKind::Generation, payload, REFINE_MAX_TOKENS, false)
            .await?;
        Ok(RefinedPrompt::new(text, usage, Lineage::QuestionDriven))
    }

    async fn light_refine(&self, prompt: &str) -> Result<RefinedPrompt, ProviderError> {
        debug!(prompt_len = prompt.len(), "LlmProvider::light_refine: called");
        let (text, usage) = self
            .call(PromptKind::AnalysisRefinement, prompt.to_string(), REFINE_MAX_TOKENS, false)
            .await?;
        Ok(RefinedPrompt::new(text, usage, Lineage::LightRefine))
    }

    async fn tweak(&self, current: &str, instruction: &str) -> Result<RefinedPrompt, ProviderError> {
        debug!(current_len = current.len(), %instruction, "LlmProvider::tweak: called");
        let payload = self.prompts.tweak_payload(&TweakPayload {
            current_prompt: current.to_string(),
            instruction: instruction.to_string(),
        })?;

        let (text, usage) = self.call(PromptKind::Tweak, payload, TWEAK_MAX_TOKENS, false).await?;
        Ok(RefinedPrompt::new(text, usage, Lineage::Tweak))
    }
}

//! Provider Capability
//!
//! The contract every LLM backend fulfils for the refinement workflow, plus
//! the factory that resolves a backend from configuration.
//!
//! All failures crossing this boundary are [`ProviderError`]s with sanitized
//! messages. Classification and question generation never fail: they degrade
//! to `generation` and to the static question set respectively.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

mod error;
mod llm_provider;
pub mod payload;
mod sanitize;

pub use error::ProviderError;
pub use llm_provider::{CLASSIFY_MAX_TOKENS, LlmProvider, QUESTIONS_MAX_TOKENS, REFINE_MAX_TOKENS, TWEAK_MAX_TOKENS};
pub use sanitize::sanitize_message;

use crate::config::ResolvedLlmConfig;
use crate::llm::create_client_from_resolved;
use crate::prompts::PromptLoader;
use crate::refine::{AnswerSet, QuestionKeyMapping, QuestionSet, RefineError, RefinedPrompt, TaskClassification};

/// Operations a refinement backend provides
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier used in logs, `provider/model`
    fn name(&self) -> &str;

    /// Classify a prompt; ambiguity and failure yield `generation`
    async fn classify_task(&self, prompt: &str) -> TaskClassification;

    /// Clarifying questions for a prompt; failure yields the static set
    async fn generate_questions(&self, prompt: &str, classification: &TaskClassification) -> QuestionSet;

    /// Refine a prompt from keyed answers
    ///
    /// Keys are replaced by their question text before anything is sent.
    async fn refine_with_answers(
        &self,
        prompt: &str,
        answers: &AnswerSet,
        mapping: &QuestionKeyMapping,
    ) -> Result<RefinedPrompt, ProviderError>;

    /// Refine a prompt without asking questions
    async fn light_refine(&self, prompt: &str) -> Result<RefinedPrompt, ProviderError>;

    /// Apply a modification request to an existing prompt
    async fn tweak(&self, current: &str, instruction: &str) -> Result<RefinedPrompt, ProviderError>;
}

/// Create a provider for a resolved configuration
///
/// Templates are looked up under `prompt_root` before the embedded defaults.
pub fn create_provider(config: &ResolvedLlmConfig, prompt_root: &Path) -> Result<Arc<dyn Provider>, RefineError> {
    debug!(provider = %config.provider, model = %config.model, ?prompt_root, "create_provider: called");
    let client = create_client_from_resolved(config).map_err(|e| RefineError::Configuration(e.to_string()))?;
    let name = format!("{}/{}", config.provider, config.model);

    Ok(Arc::new(LlmProvider::new(name, client, PromptLoader::new(prompt_root))))
}

#[cfg(test)]
pub mod mock {
    //! Recording provider for orchestrator tests

    use super::*;
    use std::sync::Mutex;

    use crate::refine::{CancelToken, Lineage, Question, TaskType};

    /// One recorded provider call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Classify,
        GenerateQuestions,
        RefineWithAnswers { lines: Vec<(String, String)> },
        LightRefine,
        Tweak { instruction: String },
    }

    /// Provider with canned behaviour that records every call
    pub struct MockProvider {
        pub task_type: TaskType,
        pub questions: Vec<Question>,
        pub fail_refine: bool,
        /// Question generation never resolves
        pub stall_questions: bool,
        /// Cancelled as a side effect of classification
        pub cancel_on_classify: Option<CancelToken>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockProvider {
        pub fn new(task_type: TaskType, questions: Vec<Question>) -> Self {
            Self {
                task_type,
                questions,
                fail_refine: false,
                stall_questions: false,
                cancel_on_classify: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(mut self) -> Self {
            self.fail_refine = true;
            self
        }

        pub fn stalling(mut self) -> Self {
            self.stall_questions = true;
            self
        }

        pub fn cancelling(mut self, token: CancelToken) -> Self {
            self.cancel_on_classify = Some(token);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("mock lock poisoned").clone()
        }

        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls().iter().filter(|c| pred(c)).count()
        }

        fn record(&self, call: Call) {
            self.calls.lock().expect("mock lock poisoned").push(call);
        }

        fn outcome(&self, text: String, lineage: Lineage) -> Result<RefinedPrompt, ProviderError> {
            if self.fail_refine {
                Err(ProviderError::new("mock provider failure"))
            } else {
                Ok(RefinedPrompt::new(text, None, lineage))
            }
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn classify_task(&self, _prompt: &str) -> TaskClassification {
            self.record(Call::Classify);
            if let Some(token) = &self.cancel_on_classify {
                token.cancel();
            }
            TaskClassification::new(self.task_type)
        }

        async fn generate_questions(&self, _prompt: &str, classification: &TaskClassification) -> QuestionSet {
            self.record(Call::GenerateQuestions);
            if self.stall_questions {
                std::future::pending::<()>().await;
            }
            QuestionSet::new(classification.clone(), self.questions.clone())
        }

        async fn refine_with_answers(
            &self,
            prompt: &str,
            answers: &AnswerSet,
            mapping: &QuestionKeyMapping,
        ) -> Result<RefinedPrompt, ProviderError> {
            let lines = payload::answer_lines(answers, mapping)
                .into_iter()
                .map(|l| (l.question, l.answer))
                .collect();
            self.record(Call::RefineWithAnswers { lines });
            self.outcome(format!("refined: {}", prompt), Lineage::QuestionDriven)
        }

        async fn light_refine(&self, prompt: &str) -> Result<RefinedPrompt, ProviderError> {
            self.record(Call::LightRefine);
            self.outcome(format!("light: {}", prompt), Lineage::LightRefine)
        }

        async fn tweak(&self, current: &str, instruction: &str) -> Result<RefinedPrompt, ProviderError> {
            self.record(Call::Tweak {
                instruction: instruction.to_string(),
            });
            self.outcome(format!("{} ({})", current, instruction), Lineage::Tweak)
        }
    }
}

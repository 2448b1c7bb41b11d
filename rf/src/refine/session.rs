//! Refinement session
//!
//! Bundles a provider with the caller's default flags and remembers the
//! latest refined prompt so follow-up tweaks have something to edit. Owned
//! by the caller; nothing here is global or persisted.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::error::RefineError;
use super::mapper::QuestionKeyMapping;
use super::orchestrator::{RefineOptions, RefinementOrchestrator};
use super::tweak::TweakOrchestrator;
use super::types::{AnswerSet, RefineOutcome, RefinedPromptResult};
use crate::config::Config;
use crate::provider::{Provider, create_provider};

pub struct RefineSession {
    provider: Arc<dyn Provider>,
    refiner: RefinementOrchestrator,
    tweaker: TweakOrchestrator,
    defaults: RefineOptions,
    current: Option<RefinedPromptResult>,
}

impl RefineSession {
    pub fn new(provider: Arc<dyn Provider>, defaults: RefineOptions) -> Self {
        debug!(provider = %provider.name(), ?defaults, "RefineSession::new: called");
        Self {
            refiner: RefinementOrchestrator::new(provider.clone()),
            tweaker: TweakOrchestrator::new(provider.clone()),
            provider,
            defaults,
            current: None,
        }
    }

    /// Build a session from configuration, with optional provider/model overrides
    pub fn from_config(
        config: &Config,
        provider: Option<&str>,
        model: Option<&str>,
        prompt_root: &Path,
    ) -> Result<Self, RefineError> {
        debug!(?provider, ?model, "RefineSession::from_config: called");
        let resolved = config
            .llm
            .resolve_with(provider, model)
            .map_err(|e| RefineError::Configuration(e.to_string()))?;
        let provider = create_provider(&resolved, prompt_root)?;

        let defaults = RefineOptions {
            static_questions: config.refine.static_questions,
            force_questions: config.refine.force_questions,
            ..RefineOptions::default()
        };
        Ok(Self::new(provider, defaults))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Flags applied to every cycle before per-call overrides
    pub fn defaults(&self) -> &RefineOptions {
        &self.defaults
    }

    /// Latest refined prompt, if any
    pub fn current(&self) -> Option<&RefinedPromptResult> {
        self.current.as_ref()
    }

    /// Start a cycle; `overrides` is merged over the session defaults
    pub async fn start(&mut self, prompt: &str, overrides: &RefineOptions) -> Result<RefineOutcome, RefineError> {
        debug!(prompt_len = prompt.len(), "RefineSession::start: called");
        let options = RefineOptions {
            skip_questions: self.defaults.skip_questions || overrides.skip_questions,
            force_questions: self.defaults.force_questions || overrides.force_questions,
            static_questions: self.defaults.static_questions || overrides.static_questions,
            cancel: overrides.cancel.clone().or_else(|| self.defaults.cancel.clone()),
        };

        let outcome = self.refiner.start_refinement(prompt, &options).await?;
        if let RefineOutcome::Refined(result) = &outcome {
            self.current = Some(result.clone());
        }
        Ok(outcome)
    }

    /// Finish a cycle with the caller's answers
    pub async fn complete(
        &mut self,
        prompt: &str,
        answers: &AnswerSet,
        mapping: &QuestionKeyMapping,
    ) -> Result<RefinedPromptResult, RefineError> {
        debug!(prompt_len = prompt.len(), "RefineSession::complete: called");
        let result = self.refiner.complete_refinement(prompt, answers, mapping).await?;
        self.current = Some(result.clone());
        Ok(result)
    }

    /// Tweak an arbitrary prompt without touching the session's current one
    pub async fn tweak_prompt(&self, current: &str, instruction: &str) -> Result<RefinedPromptResult, RefineError> {
        debug!(%instruction, "RefineSession::tweak_prompt: called");
        self.tweaker.tweak(current, instruction).await
    }

    /// Tweak the latest refined prompt
    pub async fn tweak(&mut self, instruction: &str) -> Result<RefinedPromptResult, RefineError> {
        debug!(%instruction, "RefineSession::tweak: called");
        let Some(current) = self.current.as_ref() else {
            return Err(RefineError::Validation("There is no refined prompt to tweak yet".to_string()));
        };

        let result = self.tweaker.tweak(&current.refined_prompt, instruction).await?;
        self.current = Some(result.clone());
        Ok(result)
    }
}

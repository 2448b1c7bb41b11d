//! Tweak Orchestrator
//!
//! One stateless edit of an existing prompt.

use std::sync::Arc;

use tracing::{debug, info};

use super::error::RefineError;
use super::orchestrator::validate_prompt;
use super::types::RefinedPromptResult;
use crate::provider::Provider;

/// Applies modification requests to prompts
#[derive(Clone)]
pub struct TweakOrchestrator {
    provider: Arc<dyn Provider>,
}

impl TweakOrchestrator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        debug!(provider = %provider.name(), "TweakOrchestrator::new: called");
        Self { provider }
    }

    /// Apply `instruction` to `current`
    ///
    /// A blank instruction is rejected without a provider call.
    pub async fn tweak(&self, current: &str, instruction: &str) -> Result<RefinedPromptResult, RefineError> {
        debug!(current_len = current.len(), %instruction, "TweakOrchestrator::tweak: called");
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(RefineError::Validation("Tweak instruction must not be empty".to_string()));
        }
        validate_prompt(current)?;

        let tweaked = self.provider.tweak(current, instruction).await?;
        info!("Prompt tweaked");
        Ok(tweaked.into())
    }
}

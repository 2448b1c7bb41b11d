//! Refinement Orchestrator
//!
//! Drives one refinement cycle:
//!
//! ```text
//! Start -> Classified -> QuestionsPending -> (complete_refinement) -> Done
//!                     \-> DirectRefine ----------------------------> Done
//! ```
//!
//! The orchestrator holds no state between calls. A cycle that needs
//! answers returns `ClarificationNeeded`; the caller collects answers and
//! finishes with [`RefinementOrchestrator::complete_refinement`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::{debug, info};

use super::error::RefineError;
use super::mapper::QuestionKeyMapping;
use super::static_questions::static_question_set;
use super::types::{
    AnswerSet, ClarificationNeededResult, QuestionSet, RefineOutcome, RefinedPrompt, RefinedPromptResult, TaskType,
};
use crate::provider::Provider;

/// Longest prompt accepted, in characters
pub const MAX_PROMPT_CHARS: usize = 50_000;

/// Cooperative cancellation flag shared between a caller and a cycle
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        debug!("CancelToken::cancel: called");
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `fut` to completion unless the token fires first
    ///
    /// Returns `None` when cancelled, dropping `fut` mid-flight.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => {
                debug!("CancelToken::run: cancelled while pending");
                None
            }
            value = fut => Some(value),
        }
    }
}

/// Per-cycle flags
#[derive(Debug, Clone, Default)]
pub struct RefineOptions {
    /// Return the prompt verbatim without any provider call
    pub skip_questions: bool,
    /// Ask questions even for analysis prompts
    pub force_questions: bool,
    /// Use the fixed question set instead of classifying
    pub static_questions: bool,
    pub cancel: Option<CancelToken>,
}

impl RefineOptions {
    pub fn skip() -> Self {
        Self {
            skip_questions: true,
            ..Self::default()
        }
    }

    pub fn force() -> Self {
        Self {
            force_questions: true,
            ..Self::default()
        }
    }

    pub fn static_questions() -> Self {
        Self {
            static_questions: true,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Reject empty or oversized prompts
pub fn validate_prompt(prompt: &str) -> Result<(), RefineError> {
    if prompt.trim().is_empty() {
        return Err(RefineError::Validation("Prompt must not be empty".to_string()));
    }
    let len = prompt.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(RefineError::Validation(format!(
            "Prompt is {} characters; the limit is {}",
            len, MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

/// Check answers against the mapping
///
/// Every answer key must be known, and every required question must have a
/// non-blank answer.
pub fn validate_answers(answers: &AnswerSet, mapping: &QuestionKeyMapping) -> Result<(), RefineError> {
    debug!(answer_count = answers.len(), mapping_len = mapping.len(), "validate_answers: called");
    if let Some(unknown) = answers.keys().find(|k| !mapping.contains_key(k)) {
        return Err(RefineError::Validation(format!("Unknown answer key: {}", unknown)));
    }

    for entry in mapping.iter().filter(|e| e.required) {
        let answered = answers.get(&entry.key).is_some_and(|v| !v.is_blank());
        if !answered {
            debug!(key = %entry.key, "validate_answers: missing required answer");
            return Err(RefineError::Validation(format!("Answer required for: {}", entry.text)));
        }
    }

    Ok(())
}

/// Runs refinement cycles against a provider
#[derive(Clone)]
pub struct RefinementOrchestrator {
    provider: Arc<dyn Provider>,
}

impl RefinementOrchestrator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        debug!(provider = %provider.name(), "RefinementOrchestrator::new: called");
        Self { provider }
    }

    /// Run `fut` unless the cycle is cancelled first or while it is pending
    async fn step<T>(&self, options: &RefineOptions, fut: impl Future<Output = T>) -> Option<T> {
        match &options.cancel {
            None => Some(fut.await),
            Some(token) => token.run(fut).await,
        }
    }

    /// Start a refinement cycle
    pub async fn start_refinement(&self, prompt: &str, options: &RefineOptions) -> Result<RefineOutcome, RefineError> {
        debug!(prompt_len = prompt.len(), ?options, "start_refinement: called");

        if options.skip_questions {
            info!("Skipping questions, returning prompt verbatim");
            return Ok(RefineOutcome::Refined(RefinedPrompt::verbatim(prompt).into()));
        }

        validate_prompt(prompt)?;

        if options.is_cancelled() {
            info!("Refinement cancelled before start");
            return Ok(RefineOutcome::Cancelled);
        }

        if options.static_questions {
            info!("Using static questions");
            return Ok(Self::clarification(static_question_set()));
        }

        let Some(classification) = self.step(options, self.provider.classify_task(prompt)).await else {
            info!("Refinement cancelled during classification");
            return Ok(RefineOutcome::Cancelled);
        };
        debug!(task_type = %classification.task_type, "start_refinement: classified");

        if classification.is_analysis() && !options.force_questions {
            info!("Analysis prompt, refining without questions");
            return self.light_refine(prompt, options).await;
        }

        let Some(set) = self
            .step(options, self.provider.generate_questions(prompt, &classification))
            .await
        else {
            info!("Refinement cancelled during question generation");
            return Ok(RefineOutcome::Cancelled);
        };

        if set.is_empty() {
            if set.task_type() == TaskType::Analysis {
                info!("No questions for analysis prompt, refining without questions");
                return self.light_refine(prompt, options).await;
            }
            info!("No questions needed, returning prompt verbatim");
            return Ok(RefineOutcome::Refined(RefinedPrompt::verbatim(prompt).into()));
        }

        if options.is_cancelled() {
            return Ok(RefineOutcome::Cancelled);
        }

        info!(question_count = set.len(), "Clarification needed");
        Ok(Self::clarification(set))
    }

    fn clarification(set: QuestionSet) -> RefineOutcome {
        let mapping = QuestionKeyMapping::from_questions(&set);
        RefineOutcome::ClarificationNeeded(ClarificationNeededResult::new(&set, mapping))
    }

    async fn light_refine(&self, prompt: &str, options: &RefineOptions) -> Result<RefineOutcome, RefineError> {
        debug!("RefinementOrchestrator::light_refine: called");
        match self.step(options, self.provider.light_refine(prompt)).await {
            Some(result) => Ok(RefineOutcome::Refined(result?.into())),
            None => {
                info!("Refinement cancelled during light refinement");
                Ok(RefineOutcome::Cancelled)
            }
        }
    }

    /// Finish a cycle that returned `ClarificationNeeded`
    ///
    /// Answers are validated before any provider call. An empty answer set
    /// (all questions optional and skipped) returns the prompt verbatim.
    pub async fn complete_refinement(
        &self,
        prompt: &str,
        answers: &AnswerSet,
        mapping: &QuestionKeyMapping,
    ) -> Result<RefinedPromptResult, RefineError> {
        debug!(prompt_len = prompt.len(), answer_count = answers.len(), "complete_refinement: called");
        validate_prompt(prompt)?;
        validate_answers(answers, mapping)?;

        if answers.is_empty() {
            info!("No answers given, returning prompt verbatim");
            return Ok(RefinedPrompt::verbatim(prompt).into());
        }

        let refined = self.provider.refine_with_answers(prompt, answers, mapping).await?;
        info!(lineage = ?refined.lineage, "Refinement complete");
        Ok(refined.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{Call, MockProvider};
    use crate::refine::types::{Lineage, Question, TaskClassification};

    fn blog_questions() -> Vec<Question> {
        vec![
            Question::text("Who is the audience?", true),
            Question::text("What tone should it have?", false),
        ]
    }

    fn orchestrator(mock: &Arc<MockProvider>) -> RefinementOrchestrator {
        RefinementOrchestrator::new(mock.clone())
    }

    fn refined(outcome: RefineOutcome) -> RefinedPromptResult {
        match outcome {
            RefineOutcome::Refined(r) => r,
            other => panic!("expected Refined, got {:?}", other),
        }
    }

    fn clarification(outcome: RefineOutcome) -> ClarificationNeededResult {
        match outcome {
            RefineOutcome::ClarificationNeeded(c) => c,
            other => panic!("expected ClarificationNeeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_returns_verbatim_without_calls() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()));
        let prompt = "  Write a haiku\n";

        let result = refined(orchestrator(&mock).start_refinement(prompt, &RefineOptions::skip()).await.unwrap());

        assert_eq!(result.refined_prompt, prompt);
        assert_eq!(result.lineage, Lineage::Verbatim);
        assert!(result.token_usage.is_none());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_skip_wins_over_force() {
        let mock = Arc::new(MockProvider::new(TaskType::Analysis, blog_questions()));
        let options = RefineOptions {
            skip_questions: true,
            force_questions: true,
            ..RefineOptions::default()
        };

        let result = refined(orchestrator(&mock).start_refinement("Explain X", &options).await.unwrap());
        assert_eq!(result.refined_prompt, "Explain X");
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_refines_without_questions() {
        let mock = Arc::new(MockProvider::new(TaskType::Analysis, blog_questions()));

        let result = refined(
            orchestrator(&mock)
                .start_refinement("Explain recursion", &RefineOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(result.refined_prompt, "light: Explain recursion");
        assert_eq!(result.lineage, Lineage::LightRefine);
        assert_eq!(mock.calls(), vec![Call::Classify, Call::LightRefine]);
    }

    #[tokio::test]
    async fn test_force_asks_questions_for_analysis() {
        let mock = Arc::new(MockProvider::new(TaskType::Analysis, blog_questions()));

        let c = clarification(
            orchestrator(&mock)
                .start_refinement("Explain recursion", &RefineOptions::force())
                .await
                .unwrap(),
        );

        assert_eq!(c.task_type, TaskType::Analysis);
        assert_eq!(c.questions.len(), 2);
        assert_eq!(mock.count(|c| matches!(c, Call::LightRefine)), 0);
    }

    #[tokio::test]
    async fn test_generation_returns_keyed_questions() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()));

        let c = clarification(
            orchestrator(&mock)
                .start_refinement("Write a blog post", &RefineOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(c.mapping.len(), 2);
        assert_eq!(c.questions[0].key, "q0");
        assert_eq!(c.mapping.resolve("q1"), Some("What tone should it have?"));
        assert_eq!(mock.calls(), vec![Call::Classify, Call::GenerateQuestions]);
    }

    #[tokio::test]
    async fn test_empty_generation_set_is_verbatim() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, vec![]));

        let result = refined(
            orchestrator(&mock)
                .start_refinement("Write exactly: hello", &RefineOptions::default())
                .await
                .unwrap(),
        );

        assert_eq!(result.refined_prompt, "Write exactly: hello");
        assert_eq!(result.lineage, Lineage::Verbatim);
    }

    #[tokio::test]
    async fn test_empty_forced_analysis_set_light_refines() {
        let mock = Arc::new(MockProvider::new(TaskType::Analysis, vec![]));

        let result = refined(
            orchestrator(&mock)
                .start_refinement("Explain recursion", &RefineOptions::force())
                .await
                .unwrap(),
        );

        assert_eq!(result.lineage, Lineage::LightRefine);
        assert_eq!(
            mock.calls(),
            vec![Call::Classify, Call::GenerateQuestions, Call::LightRefine]
        );
    }

    #[tokio::test]
    async fn test_static_questions_make_no_provider_calls() {
        let mock = Arc::new(MockProvider::new(TaskType::Analysis, blog_questions()));

        let c = clarification(
            orchestrator(&mock)
                .start_refinement("Anything", &RefineOptions::static_questions())
                .await
                .unwrap(),
        );

        assert_eq!(c.task_type, TaskType::Generation);
        assert_eq!(c.questions.len(), 4);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_prompts_rejected() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()));
        let orch = orchestrator(&mock);

        let err = orch.start_refinement("   ", &RefineOptions::default()).await.unwrap_err();
        assert!(err.is_validation());

        let huge = "x".repeat(MAX_PROMPT_CHARS + 1);
        let err = orch.start_refinement(&huge, &RefineOptions::default()).await.unwrap_err();
        assert!(err.is_validation());

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_light_refine_failure_propagates() {
        let mock = Arc::new(MockProvider::new(TaskType::Analysis, vec![]).failing());

        let err = orchestrator(&mock)
            .start_refinement("Explain recursion", &RefineOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_provider());
        assert_eq!(mock.count(|c| matches!(c, Call::LightRefine)), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()));
        let token = CancelToken::new();
        token.cancel();

        let outcome = orchestrator(&mock)
            .start_refinement("Write a blog post", &RefineOptions::default().with_cancel(token))
            .await
            .unwrap();

        assert_eq!(outcome, RefineOutcome::Cancelled);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_between_steps() {
        let token = CancelToken::new();
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()).cancelling(token.clone()));

        let outcome = orchestrator(&mock)
            .start_refinement("Write a blog post", &RefineOptions::default().with_cancel(token))
            .await
            .unwrap();

        assert_eq!(outcome, RefineOutcome::Cancelled);
        assert_eq!(mock.calls(), vec![Call::Classify]);
    }

    #[tokio::test]
    async fn test_cancelled_while_provider_call_pending() {
        let token = CancelToken::new();
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()).stalling());
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                token.cancel();
            })
        };

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            orchestrator(&mock).start_refinement("Write a blog post", &RefineOptions::default().with_cancel(token)),
        )
        .await
        .expect("pending question generation was not interrupted")
        .unwrap();

        canceller.await.unwrap();
        assert_eq!(outcome, RefineOutcome::Cancelled);
        assert_eq!(mock.calls(), vec![Call::Classify, Call::GenerateQuestions]);
    }

    #[tokio::test]
    async fn test_cancel_token_run() {
        let token = CancelToken::new();
        assert_eq!(token.run(async { 7 }).await, Some(7));

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                token.cancel();
            })
        };
        assert_eq!(token.run(std::future::pending::<u32>()).await, None);
        canceller.await.unwrap();

        assert_eq!(token.run(async { 7 }).await, None);
    }

    #[tokio::test]
    async fn test_complete_without_answers_is_verbatim() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, vec![]));
        let set = QuestionSet::new(
            TaskClassification::new(TaskType::Generation),
            vec![Question::text("Any tone preference?", false)],
        );
        let mapping = QuestionKeyMapping::from_questions(&set);

        let result = orchestrator(&mock)
            .complete_refinement("Write a blog post", &AnswerSet::new(), &mapping)
            .await
            .unwrap();

        assert_eq!(result.refined_prompt, "Write a blog post");
        assert_eq!(result.lineage, Lineage::Verbatim);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_complete_substitutes_question_text() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()));
        let orch = orchestrator(&mock);
        let c = clarification(
            orch.start_refinement("Write a blog post", &RefineOptions::default())
                .await
                .unwrap(),
        );

        let answers = AnswerSet::new().with("q0", "developers").with("q1", "casual");
        let result = orch
            .complete_refinement("Write a blog post", &answers, &c.mapping)
            .await
            .unwrap();

        assert_eq!(result.lineage, Lineage::QuestionDriven);
        assert_eq!(
            mock.calls().last(),
            Some(&Call::RefineWithAnswers {
                lines: vec![
                    ("Who is the audience?".to_string(), "developers".to_string()),
                    ("What tone should it have?".to_string(), "casual".to_string()),
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_complete_requires_required_answers() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()));
        let set = QuestionSet::new(
            TaskClassification::new(TaskType::Generation),
            blog_questions(),
        );
        let mapping = QuestionKeyMapping::from_questions(&set);

        for answers in [
            AnswerSet::new().with("q1", "casual"),
            AnswerSet::new().with("q0", "   ").with("q1", "casual"),
        ] {
            let err = orchestrator(&mock)
                .complete_refinement("Write a blog post", &answers, &mapping)
                .await
                .unwrap_err();
            assert_eq!(
                err,
                RefineError::Validation("Answer required for: Who is the audience?".to_string())
            );
        }
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_complete_allows_missing_optional_answers() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, blog_questions()));
        let set = QuestionSet::new(
            TaskClassification::new(TaskType::Generation),
            blog_questions(),
        );
        let mapping = QuestionKeyMapping::from_questions(&set);

        let result = orchestrator(&mock)
            .complete_refinement("Write a blog post", &AnswerSet::new().with("q0", "devs"), &mapping)
            .await
            .unwrap();
        assert_eq!(result.refined_prompt, "refined: Write a blog post");
    }

    #[tokio::test]
    async fn test_complete_rejects_unknown_keys() {
        let mock = Arc::new(MockProvider::new(TaskType::Generation, vec![]));
        let err = orchestrator(&mock)
            .complete_refinement(
                "Write a blog post",
                &AnswerSet::new().with("q5", "x"),
                &QuestionKeyMapping::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, RefineError::Validation("Unknown answer key: q5".to_string()));
        assert!(mock.calls().is_empty());
    }
}

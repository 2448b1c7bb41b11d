//! Adaptive refinement workflow
//!
//! Question mapping, the refinement state machine and tweak edits, all
//! expressed against the [`Provider`](crate::provider::Provider) capability.

mod error;
mod mapper;
mod orchestrator;
mod session;
mod static_questions;
mod tweak;
mod types;

pub use error::RefineError;
pub use mapper::{MappedQuestion, QuestionKeyMapping};
pub use orchestrator::{
    CancelToken, MAX_PROMPT_CHARS, RefineOptions, RefinementOrchestrator, validate_answers, validate_prompt,
};
pub use session::RefineSession;
pub use static_questions::static_question_set;
pub use tweak::TweakOrchestrator;
pub use types::{
    AnswerSet, AnswerValue, ClarificationNeededResult, KeyedQuestion, Lineage, Question, QuestionKind, QuestionSet,
    RefineOutcome, RefinedPrompt, RefinedPromptResult, TaskClassification, TaskType,
};

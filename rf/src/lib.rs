//! Refinery - adaptive prompt refinement
//!
//! Refinery turns a rough natural-language prompt into a sharper one. It
//! classifies the request as analysis or generation, asks clarifying
//! questions when they would help, and has an LLM rewrite the prompt from
//! the answers. Refined prompts can then be tweaked one instruction at a
//! time.
//!
//! # Modules
//!
//! - [`llm`] - LLM transport: client trait plus Anthropic, OpenAI and Gemini clients
//! - [`provider`] - Provider capability, factory and response normalization
//! - [`refine`] - Question mapping, refinement and tweak orchestrators, sessions
//! - [`prompts`] - Prompt templates and their loader
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`interactive`] - Terminal question and tweak prompts

pub mod cli;
pub mod config;
pub mod interactive;
pub mod llm;
pub mod prompts;
pub mod provider;
pub mod refine;

// Re-export commonly used types
pub use config::{Config, LlmConfig, ResolvedLlmConfig};
pub use llm::{LlmClient, LlmError, ProviderKind, TokenUsage};
pub use provider::{LlmProvider, Provider, ProviderError, create_provider};
pub use refine::{
    AnswerSet, AnswerValue, CancelToken, ClarificationNeededResult, Lineage, Question, QuestionKeyMapping,
    QuestionKind, QuestionSet, RefineError, RefineOptions, RefineOutcome, RefineSession, RefinedPrompt,
    RefinedPromptResult, RefinementOrchestrator, TaskClassification, TaskType, TweakOrchestrator,
};

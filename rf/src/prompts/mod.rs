//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files: the system instructions
//! sent with every provider call and the user payloads built from a prompt,
//! its answers or a tweak request.
//!
//! Template loading chain:
//! 1. `.refinery/prompts/{name}.pmt` (user override)
//! 2. `prompts/{name}.pmt` (repo default)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution, with HTML
//! escaping disabled.

pub mod embedded;
mod loader;

pub use loader::{AnsweredQuestion, PromptKind, PromptLoader, QuestionsPayload, RefinePayload, TweakPayload};

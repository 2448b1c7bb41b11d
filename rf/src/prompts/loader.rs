//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// The system instructions a provider can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Analysis vs generation classifier
    Classification,
    /// Clarifying question generator
    Clarification,
    /// Refinement from a prompt plus answers
    Generation,
    /// Refinement without questions
    AnalysisRefinement,
    /// Surgical edit of an existing prompt
    Tweak,
}

impl PromptKind {
    /// Get the template name for this system instruction
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Clarification => "clarification",
            Self::Generation => "generation",
            Self::AnalysisRefinement => "analysis-refinement",
            Self::Tweak => "tweak",
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.template_name())
    }
}

/// One rendered line of the refinement payload
#[derive(Debug, Clone, Serialize)]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: String,
}

/// Context for `refine-payload.pmt`
#[derive(Debug, Clone, Serialize)]
pub struct RefinePayload {
    pub initial_prompt: String,
    /// Pre-rendered `- question: answer` lines, newline separated
    pub answers: String,
    #[serde(skip)]
    answer_count: usize,
}

impl RefinePayload {
    pub fn new(initial_prompt: impl Into<String>, answers: &[AnsweredQuestion]) -> Self {
        let lines: Vec<String> = answers
            .iter()
            .map(|a| format!("- {}: {}", a.question, a.answer))
            .collect();
        Self {
            initial_prompt: initial_prompt.into(),
            answers: lines.join("\n"),
            answer_count: lines.len(),
        }
    }
}

/// Context for `tweak-payload.pmt`
#[derive(Debug, Clone, Serialize)]
pub struct TweakPayload {
    pub current_prompt: String,
    pub instruction: String,
}

/// Context for `questions-payload.pmt`
#[derive(Debug, Clone, Serialize)]
pub struct QuestionsPayload {
    pub prompt: String,
    pub task_type: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.refinery/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `root`
    ///
    /// Looks for `.refinery/prompts/` and `prompts/` under `root`; missing
    /// directories are skipped.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        debug!(?root, "PromptLoader::new: called");
        let user_dir = root.join(".refinery/prompts");
        let repo_dir = root.join("prompts");

        let user_dir_exists = user_dir.is_dir();
        let repo_dir_exists = repo_dir.is_dir();
        debug!(
            ?user_dir,
            %user_dir_exists,
            ?repo_dir,
            %repo_dir_exists,
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: Self::engine(),
            user_dir: user_dir_exists.then_some(user_dir),
            repo_dir: repo_dir_exists.then_some(repo_dir),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // prompts are plain text; `&` and `<` must survive rendering
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.refinery/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for (label, dir) in [("user override", &self.user_dir), ("repo", &self.repo_dir)] {
            let Some(dir) = dir else {
                continue;
            };
            let path = dir.join(format!("{}.pmt", name));
            if path.is_file() {
                debug!(?path, %label, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read {} prompt {}: {}", label, path.display(), e));
            }
            debug!(?path, %label, "PromptLoader::load_template: not found");
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Load the system instruction for `kind`
    pub fn system_instruction(&self, kind: PromptKind) -> Result<String> {
        debug!(%kind, "PromptLoader::system_instruction: called");
        self.load_template(kind.template_name()).map(|s| s.trim().to_string())
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Render the refinement payload
    pub fn refine_payload(&self, payload: &RefinePayload) -> Result<String> {
        debug!(answer_count = payload.answer_count, "PromptLoader::refine_payload: called");
        self.render("refine-payload", payload)
    }

    /// Render the tweak payload
    pub fn tweak_payload(&self, payload: &TweakPayload) -> Result<String> {
        debug!("PromptLoader::tweak_payload: called");
        self.render("tweak-payload", payload)
    }

    /// Render the question-generation payload
    pub fn questions_payload(&self, payload: &QuestionsPayload) -> Result<String> {
        debug!(task_type = %payload.task_type, "PromptLoader::questions_payload: called");
        self.render("questions-payload", payload)
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_system_instruction_embedded() {
        let loader = PromptLoader::embedded_only();
        let text = loader.system_instruction(PromptKind::Tweak).unwrap();
        assert!(text.starts_with("You are a prompt-engineering specialist."));
        assert_eq!(text, text.trim());
    }

    #[test]
    fn test_refine_payload_layout() {
        let loader = PromptLoader::embedded_only();
        let payload = RefinePayload::new(
            "Write a blog post",
            &[
                AnsweredQuestion {
                    question: "Who is the audience?".to_string(),
                    answer: "developers".to_string(),
                },
                AnsweredQuestion {
                    question: "Which tone?".to_string(),
                    answer: "casual, witty".to_string(),
                },
            ],
        );

        let text = loader.refine_payload(&payload).unwrap();
        assert_eq!(
            text,
            "Initial Prompt: Write a blog post\n\n\
             User's Answers to Clarifying Questions:\n\
             - Who is the audience?: developers\n\
             - Which tone?: casual, witty\n\n\
             Please generate a refined, optimized prompt based on this information."
        );
    }

    #[test]
    fn test_payload_is_not_html_escaped() {
        let loader = PromptLoader::embedded_only();
        let payload = TweakPayload {
            current_prompt: "Compare <A> & \"B\"".to_string(),
            instruction: "keep it short".to_string(),
        };

        let text = loader.tweak_payload(&payload).unwrap();
        assert_eq!(
            text,
            "Current Prompt:\nCompare <A> & \"B\"\n\nUser's Modification Request:\nkeep it short\n\nReturn the tweaked prompt:"
        );
    }

    #[test]
    fn test_questions_payload_mentions_task_type() {
        let loader = PromptLoader::embedded_only();
        let text = loader
            .questions_payload(&QuestionsPayload {
                prompt: "Write a poem".to_string(),
                task_type: "generation".to_string(),
            })
            .unwrap();
        assert!(text.starts_with("Write a poem"));
        assert!(text.contains("generation"));
    }

    #[test]
    fn test_user_override_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".refinery/prompts")).unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join(".refinery/prompts/tweak.pmt"), "user tweak").unwrap();
        std::fs::write(dir.path().join("prompts/tweak.pmt"), "repo tweak").unwrap();
        std::fs::write(dir.path().join("prompts/generation.pmt"), "repo generation").unwrap();

        let loader = PromptLoader::new(dir.path());
        assert_eq!(loader.system_instruction(PromptKind::Tweak).unwrap(), "user tweak");
        assert_eq!(loader.system_instruction(PromptKind::Generation).unwrap(), "repo generation");
        assert!(
            loader
                .system_instruction(PromptKind::Classification)
                .unwrap()
                .contains("analysis")
        );
    }

    #[test]
    fn test_prompt_loader_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}

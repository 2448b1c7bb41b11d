//! Domain types for the refinement workflow

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mapper::QuestionKeyMapping;
use crate::llm::TokenUsage;

/// Coarse intent category of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Explore, investigate or explain something that exists
    Analysis,
    /// Produce new content
    Generation,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Analysis => "analysis",
            TaskType::Generation => "generation",
        }
    }

    /// Parse classifier output, tolerating case and surrounding whitespace
    ///
    /// Returns `None` for anything that is not exactly one of the two labels.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "analysis" => Some(TaskType::Analysis),
            "generation" => Some(TaskType::Generation),
            _ => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskClassification {
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl TaskClassification {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Classification used when the classifier gives no usable answer
    pub fn fallback() -> Self {
        Self::new(TaskType::Generation)
    }

    pub fn is_analysis(&self) -> bool {
        self.task_type == TaskType::Analysis
    }
}

/// How a question expects to be answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    SingleChoice,
    MultiChoice,
}

impl QuestionKind {
    /// Map the wire `type` used in generated question JSON
    ///
    /// `radio` and `checkbox` are the choice kinds; everything else is free text.
    pub fn from_wire(kind: &str) -> Self {
        match kind.trim().to_lowercase().as_str() {
            "radio" => QuestionKind::SingleChoice,
            "checkbox" => QuestionKind::MultiChoice,
            _ => QuestionKind::Text,
        }
    }

    pub fn is_choice(&self) -> bool {
        !matches!(self, QuestionKind::Text)
    }
}

/// A single clarifying question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub kind: QuestionKind,
    /// Choices for `SingleChoice`/`MultiChoice`; empty for `Text`
    #[serde(default)]
    pub options: Vec<String>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Question {
    /// A free-text question
    pub fn text(text: impl Into<String>, required: bool) -> Self {
        Self {
            text: text.into(),
            kind: QuestionKind::Text,
            options: Vec::new(),
            required,
            default: None,
        }
    }

    /// A choice question; with no options it degrades to free text
    pub fn choice(text: impl Into<String>, kind: QuestionKind, options: Vec<String>, required: bool) -> Self {
        let kind = if options.is_empty() { QuestionKind::Text } else { kind };
        Self {
            text: text.into(),
            kind,
            options,
            required,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Ordered clarifying questions together with the classification they were generated for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub classification: TaskClassification,
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(classification: TaskClassification, questions: Vec<Question>) -> Self {
        Self {
            classification,
            questions,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.classification.task_type
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }
}

/// A user's answer to one question
///
/// Serialized untagged: a JSON string for text/single choice, an array of
/// strings for multi choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
}

impl AnswerValue {
    /// True when the answer carries no content
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::Choices(c) => c.iter().all(|s| s.trim().is_empty()),
        }
    }

    /// Text used for this answer in the refinement payload
    pub fn render(&self) -> String {
        match self {
            AnswerValue::Text(s) if s.trim().is_empty() => "None provided".to_string(),
            AnswerValue::Text(s) => s.trim().to_string(),
            AnswerValue::Choices(c) => {
                let picked: Vec<&str> = c.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
                if picked.is_empty() {
                    "None selected".to_string()
                } else {
                    picked.join(", ")
                }
            }
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        AnswerValue::Text(s)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(c: Vec<String>) -> Self {
        AnswerValue::Choices(c)
    }
}

/// Answers keyed by question key (`q0`, `q1`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: BTreeMap<String, AnswerValue>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AnswerValue>) {
        self.answers.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&AnswerValue> {
        self.answers.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.answers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl<K: Into<String>, V: Into<AnswerValue>> FromIterator<(K, V)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Which path produced a refined prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lineage {
    /// The original prompt, unchanged
    Verbatim,
    /// Light refinement without questions
    LightRefine,
    /// Refinement from clarifying answers
    QuestionDriven,
    /// A tweak of an earlier prompt
    Tweak,
}

/// Output of a provider refinement call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinedPrompt {
    pub text: String,
    pub usage: Option<TokenUsage>,
    pub lineage: Lineage,
}

impl RefinedPrompt {
    pub fn new(text: impl Into<String>, usage: Option<TokenUsage>, lineage: Lineage) -> Self {
        Self {
            text: text.into(),
            usage,
            lineage,
        }
    }

    /// The input prompt returned unchanged
    pub fn verbatim(prompt: &str) -> Self {
        debug!(prompt_len = prompt.len(), "RefinedPrompt::verbatim: called");
        Self::new(prompt, None, Lineage::Verbatim)
    }
}

/// A finished refinement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedPromptResult {
    pub refined_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub lineage: Lineage,
}

impl From<RefinedPrompt> for RefinedPromptResult {
    fn from(p: RefinedPrompt) -> Self {
        Self {
            refined_prompt: p.text,
            token_usage: p.usage,
            lineage: p.lineage,
        }
    }
}

/// A question as presented to the caller, with its key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedQuestion {
    pub key: String,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Questions the caller must answer before refinement can complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationNeededResult {
    pub task_type: TaskType,
    pub questions: Vec<KeyedQuestion>,
    pub mapping: QuestionKeyMapping,
}

impl ClarificationNeededResult {
    pub fn new(set: &QuestionSet, mapping: QuestionKeyMapping) -> Self {
        debug!(question_count = set.len(), "ClarificationNeededResult::new: called");
        let questions = set
            .iter()
            .zip(mapping.iter())
            .map(|(q, entry)| KeyedQuestion {
                key: entry.key.clone(),
                text: q.text.clone(),
                kind: q.kind,
                options: q.kind.is_choice().then(|| q.options.clone()),
                required: q.required,
                default: q.default.clone(),
            })
            .collect();

        Self {
            task_type: set.task_type(),
            questions,
            mapping,
        }
    }
}

/// Outcome of starting a refinement cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefineOutcome {
    Refined(RefinedPromptResult),
    ClarificationNeeded(ClarificationNeededResult),
    Cancelled,
}

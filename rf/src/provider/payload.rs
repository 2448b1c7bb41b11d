//! Provider response normalization and payload assembly
//!
//! Turns raw model text into domain types and answers into payload lines.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ProviderError;
use crate::prompts::AnsweredQuestion;
use crate::refine::{AnswerSet, Question, QuestionKeyMapping, QuestionKind, QuestionSet, TaskClassification, TaskType};

/// Upper bound on questions kept from a generated set
pub const MAX_QUESTIONS: usize = 6;

/// Strip a surrounding markdown code fence, preferring a ```json block
pub fn extract_json_block(text: &str) -> &str {
    for fence in ["```json", "```"] {
        if let Some(start) = text.find(fence) {
            let body = &text[start + fence.len()..];
            let end = body.find("```").unwrap_or(body.len());
            return body[..end].trim();
        }
    }
    text.trim()
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    task_type: Option<String>,
    rationale: Option<String>,
}

/// Parse classifier output
///
/// Accepts either the JSON object the classifier is asked for or a bare
/// label. Returns `None` when neither yields exactly one known task type.
pub fn parse_classification(text: &str) -> Option<TaskClassification> {
    debug!(text_len = text.len(), "parse_classification: called");
    let body = extract_json_block(text);

    if let Ok(raw) = serde_json::from_str::<RawClassification>(body) {
        let task_type = raw.task_type.as_deref().and_then(TaskType::parse_label)?;
        let mut classification = TaskClassification::new(task_type);
        if let Some(rationale) = raw.rationale.filter(|r| !r.trim().is_empty()) {
            classification = classification.with_rationale(rationale.trim());
        }
        return Some(classification);
    }

    let label = body.trim_matches(|c: char| c == '"' || c == '.' || c.is_whitespace());
    TaskType::parse_label(label).map(TaskClassification::new)
}

#[derive(Debug, Deserialize)]
struct RawQuestionResponse {
    task_type: Option<String>,
    questions: Option<Vec<RawQuestion>>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    options: Vec<Value>,
    required: Option<bool>,
    default: Option<Value>,
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => Some(other.to_string()),
    }
}

/// Parse generated question JSON into a question set for `classification`
///
/// The set keeps the caller's classification; a disagreeing `task_type` in
/// the response is only logged.
pub fn parse_question_set(text: &str, classification: &TaskClassification) -> Result<QuestionSet, ProviderError> {
    debug!(text_len = text.len(), "parse_question_set: called");
    let body = extract_json_block(text);
    let raw: RawQuestionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::new(format!("Question response was not valid JSON: {}", e)))?;

    if let Some(reported) = raw.task_type.as_deref().and_then(TaskType::parse_label)
        && reported != classification.task_type
    {
        debug!(%reported, classified = %classification.task_type, "parse_question_set: task type disagreement");
    }

    let raw_questions = raw
        .questions
        .ok_or_else(|| ProviderError::new("Question response had no questions array"))?;

    if raw_questions.len() > MAX_QUESTIONS {
        warn!(
            received = raw_questions.len(),
            kept = MAX_QUESTIONS,
            "parse_question_set: dropping extra questions"
        );
    }

    let questions = raw_questions
        .into_iter()
        .take(MAX_QUESTIONS)
        .enumerate()
        .map(|(i, q)| {
            let text = q
                .question
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("Question {}", i + 1));
            let kind = QuestionKind::from_wire(q.kind.as_deref().unwrap_or("text"));
            let options: Vec<String> = if kind.is_choice() {
                q.options.iter().filter_map(value_to_text).collect()
            } else {
                Vec::new()
            };
            let question = Question::choice(text, kind, options, q.required.unwrap_or(true));
            match q.default.as_ref().and_then(value_to_text) {
                Some(default) => question.with_default(default),
                None => question,
            }
        })
        .collect();

    Ok(QuestionSet::new(classification.clone(), questions))
}

/// Translate keyed answers into question-text lines, in mapping order
///
/// Keys never leave this function; keys absent from `answers` are skipped.
pub fn answer_lines(answers: &AnswerSet, mapping: &QuestionKeyMapping) -> Vec<AnsweredQuestion> {
    debug!(answer_count = answers.len(), mapping_len = mapping.len(), "answer_lines: called");
    mapping
        .iter()
        .filter_map(|entry| {
            answers.get(&entry.key).map(|value| AnsweredQuestion {
                question: entry.text.clone(),
                answer: value.render(),
            })
        })
        .collect()
}

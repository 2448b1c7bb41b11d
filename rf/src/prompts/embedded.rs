//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// System instruction for question generation
pub const CLARIFICATION: &str = include_str!("../../prompts/clarification.pmt");

/// System instruction for task classification
pub const CLASSIFICATION: &str = include_str!("../../prompts/classification.pmt");

/// System instruction for answer-driven refinement
pub const GENERATION: &str = include_str!("../../prompts/generation.pmt");

/// System instruction for light (question-free) refinement
pub const ANALYSIS_REFINEMENT: &str = include_str!("../../prompts/analysis-refinement.pmt");

/// System instruction for tweak edits
pub const TWEAK: &str = include_str!("../../prompts/tweak.pmt");

/// User payload for answer-driven refinement
pub const REFINE_PAYLOAD: &str = include_str!("../../prompts/refine-payload.pmt");

/// User payload for tweak edits
pub const TWEAK_PAYLOAD: &str = include_str!("../../prompts/tweak-payload.pmt");

/// User payload for question generation
pub const QUESTIONS_PAYLOAD: &str = include_str!("../../prompts/questions-payload.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let content = match name {
        "clarification" => Some(CLARIFICATION),
        "classification" => Some(CLASSIFICATION),
        "generation" => Some(GENERATION),
        "analysis-refinement" => Some(ANALYSIS_REFINEMENT),
        "tweak" => Some(TWEAK),
        "refine-payload" => Some(REFINE_PAYLOAD),
        "tweak-payload" => Some(TWEAK_PAYLOAD),
        "questions-payload" => Some(QUESTIONS_PAYLOAD),
        _ => None,
    };
    if content.is_none() {
        debug!(%name, "get_embedded: no match found");
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_system_instructions() {
        assert!(get_embedded("clarification").unwrap().contains("\"task_type\""));
        assert!(get_embedded("classification").unwrap().contains("generation"));
        assert!(get_embedded("generation").unwrap().contains("Initial Prompt"));
        assert!(get_embedded("analysis-refinement").unwrap().contains("Do not ask the user questions"));
        assert!(get_embedded("tweak").unwrap().contains("Modification Request"));
    }

    #[test]
    fn test_get_embedded_payloads() {
        assert!(get_embedded("refine-payload").unwrap().starts_with("Initial Prompt:"));
        assert!(get_embedded("tweak-payload").unwrap().starts_with("Current Prompt:"));
        assert!(get_embedded("questions-payload").unwrap().contains("{{task_type}}"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}

//! Fixed clarifying questions
//!
//! Used when static mode is requested and whenever question generation fails.

use tracing::debug;

use super::types::{Question, QuestionSet, TaskClassification, TaskType};

/// The fixed question set, classified as generation
pub fn static_question_set() -> QuestionSet {
    debug!("static_question_set: called");
    QuestionSet::new(
        TaskClassification::new(TaskType::Generation).with_rationale("static question set"),
        vec![
            Question::text("What is the goal of this prompt?", true),
            Question::text("Who is the target audience?", true),
            Question::text("What tone should it have? (e.g., formal, casual)", false),
            Question::text("What is the desired output format? (e.g., list, paragraph, JSON)", false),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::types::QuestionKind;

    #[test]
    fn test_static_set_shape() {
        let set = static_question_set();
        assert_eq!(set.task_type(), TaskType::Generation);
        assert_eq!(set.len(), 4);
        assert!(set.iter().all(|q| q.kind == QuestionKind::Text));

        let required: Vec<bool> = set.iter().map(|q| q.required).collect();
        assert_eq!(required, vec![true, true, false, false]);
    }
}

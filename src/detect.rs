use crate::models::{QuestionType, RawQuestion};
use serde_json::Value;

pub const BLANK_MARKER: &str = "____";

const DESCRIPTIVE_MARKERS: &[&str] = &["descriptive", "essay", "서술"];
const TRUE_FALSE_MARKERS: &[&str] = &["true_false", "true/false", "true-false", "o/x", "참/거짓"];

fn hint_matches(hint: &str, markers: &[&str]) -> bool {
    let hint = hint.to_lowercase();
    markers.iter().any(|m| hint.contains(m))
}

// "ox" only counts as a whole word, otherwise "inbox" would match.
fn hint_has_ox(hint: &str) -> bool {
    hint.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "ox")
}

/// Infers the question type from the optional human label and then from
/// which fields the question carries. The checks run in a fixed order and
/// the first hit wins, so a question with both `model_answer` and a boolean
/// `correct_answer` is descriptive.
pub fn detect(question: &RawQuestion, hint: Option<&str>) -> QuestionType {
    if let Some(hint) = hint {
        if hint_matches(hint, DESCRIPTIVE_MARKERS) {
            return QuestionType::Descriptive;
        }
        if hint_matches(hint, TRUE_FALSE_MARKERS) || hint_has_ox(hint) {
            return QuestionType::TrueFalse;
        }
    }

    if question.has("answer_keywords") || question.has("model_answer") {
        return QuestionType::Descriptive;
    }

    if question.has("correct_sequence") || question.has("items") {
        return QuestionType::Sequence;
    }

    let has_options = question
        .array_field("options")
        .map(|opts| !opts.is_empty())
        .unwrap_or(false);
    let text_answer = question
        .str_field("correct_answer")
        .map(|s| !s.is_empty())
        .unwrap_or(false);
    if text_answer && !has_options {
        return QuestionType::ShortAnswer;
    }

    let has_marker = question
        .text()
        .map(|t| t.contains(BLANK_MARKER))
        .unwrap_or(false);
    if question.has("blanks") || has_marker || question.array_field("correct_answers").is_some() {
        return QuestionType::FillInTheBlank;
    }

    if matches!(question.get("correct_answer"), Some(Value::Bool(_))) {
        return QuestionType::TrueFalse;
    }

    QuestionType::MultipleChoice
}

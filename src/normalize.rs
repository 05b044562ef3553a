use crate::models::{Blank, NormalizedQuestion, QuestionBody, QuestionType, RawQuestion};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// A run of four or more underscores is one blank.
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{4,}").expect("static regex"));

/// Renders scalar JSON as the text a user would have typed.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Boolean coercion shared by the preprocessor and the true/false grader.
/// Strings are true only when they spell "true".
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        _ => Vec::new(),
    }
}

pub fn count_blank_markers(text: &str) -> usize {
    BLANK_RUN.find_iter(text).count()
}

fn explicit_blanks(entries: &[Value], correct_answers: &[String]) -> Vec<Blank> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let fallback = || correct_answers.get(idx).cloned().unwrap_or_default();
            match entry {
                Value::Object(map) => {
                    let id = map
                        .get("id")
                        .and_then(value_text)
                        .unwrap_or_else(|| idx.to_string());
                    let answer = ["answer", "correct_answer", "correct"]
                        .iter()
                        .find_map(|key| map.get(*key).and_then(value_text))
                        .unwrap_or_else(fallback);
                    Blank { id, answer }
                }
                other => Blank {
                    id: idx.to_string(),
                    answer: value_text(other).unwrap_or_else(fallback),
                },
            }
        })
        .collect()
}

fn synthesized_blanks(question: &RawQuestion, text: &str, correct_answers: &[String]) -> Vec<Blank> {
    let markers = count_blank_markers(text);
    if markers == 0 {
        return question
            .get("correct_answer")
            .and_then(value_text)
            .map(|answer| vec![Blank { id: "0".into(), answer }])
            .unwrap_or_default();
    }
    (0..markers)
        .map(|idx| Blank {
            id: idx.to_string(),
            answer: correct_answers.get(idx).cloned().unwrap_or_default(),
        })
        .collect()
}

fn keyword_list(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Produces the shape the grader for `ty` expects. The raw question is left
/// untouched; every type-specific field gets a default when it is missing.
pub fn normalize(question: &RawQuestion, ty: QuestionType) -> NormalizedQuestion {
    let question_text = question.text().unwrap_or_default().to_string();
    let options = question.array_field("options").cloned().unwrap_or_default();
    let explanation = question.str_field("explanation").map(str::to_string);

    let body = match ty {
        QuestionType::MultipleChoice => QuestionBody::MultipleChoice {
            correct_answer: question.get("correct_answer").cloned().unwrap_or(Value::Null),
        },
        QuestionType::TrueFalse => QuestionBody::TrueFalse {
            correct_answer: question.get("correct_answer").map(truthy).unwrap_or(false),
        },
        QuestionType::Sequence => {
            let items = question.array_field("items").cloned().unwrap_or_default();
            let correct_sequence = question
                .array_field("correct_sequence")
                .cloned()
                .unwrap_or_else(|| items.clone());
            QuestionBody::Sequence { items, correct_sequence }
        }
        QuestionType::FillInTheBlank => {
            let correct_answers = string_list(question.get("correct_answers"));
            let blanks = match question.array_field("blanks") {
                Some(entries) => explicit_blanks(entries, &correct_answers),
                None => synthesized_blanks(question, &question_text, &correct_answers),
            };
            QuestionBody::FillInTheBlank { blanks, correct_answers }
        }
        QuestionType::ShortAnswer => QuestionBody::ShortAnswer {
            correct_answer: question
                .get("correct_answer")
                .and_then(value_text)
                .unwrap_or_default(),
            alternative_answers: string_list(question.get("alternative_answers")),
            case_sensitive: question.get("case_sensitive").map(truthy).unwrap_or(false),
        },
        QuestionType::Descriptive => QuestionBody::Descriptive {
            answer_keywords: keyword_list(question.get("answer_keywords")),
            model_answer: question.str_field("model_answer").unwrap_or_default().to_string(),
        },
    };

    NormalizedQuestion {
        question_text,
        options,
        explanation,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawQuestion {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn legacy_question_field_becomes_text() {
        let q = normalize(&raw(json!({"question": "Legacy?"})), QuestionType::MultipleChoice);
        assert_eq!(q.question_text, "Legacy?");
        let q = normalize(
            &raw(json!({"question": "old", "question_text": "new"})),
            QuestionType::MultipleChoice,
        );
        assert_eq!(q.question_text, "new");
    }

    #[test]
    fn true_false_string_coercion() {
        let cases = [(json!("TRUE"), true), (json!("false"), false), (json!("yes"), false), (json!(true), true)];
        for (answer, expected) in cases {
            let q = normalize(&raw(json!({"correct_answer": answer})), QuestionType::TrueFalse);
            assert_eq!(q.body, QuestionBody::TrueFalse { correct_answer: expected });
        }
    }

    #[test]
    fn sequence_items_default_to_empty() {
        let q = normalize(&raw(json!({"items": "not a list"})), QuestionType::Sequence);
        assert_eq!(
            q.body,
            QuestionBody::Sequence { items: vec![], correct_sequence: vec![] }
        );
    }

    #[test]
    fn single_placeholder_synthesizes_one_blank() {
        let q = normalize(
            &raw(json!({"question_text": "The ____ is blue.", "correct_answers": ["sky"]})),
            QuestionType::FillInTheBlank,
        );
        match q.body {
            QuestionBody::FillInTheBlank { blanks, .. } => {
                assert_eq!(blanks, vec![Blank { id: "0".into(), answer: "sky".into() }]);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn placeholders_pull_answers_positionally() {
        let q = normalize(
            &raw(json!({"question": "____ and ________ and ____", "correct_answers": ["a", "b"]})),
            QuestionType::FillInTheBlank,
        );
        let QuestionBody::FillInTheBlank { blanks, .. } = q.body else { panic!("wrong body") };
        let answers: Vec<_> = blanks.iter().map(|b| b.answer.as_str()).collect();
        assert_eq!(answers, vec!["a", "b", ""]);
    }

    #[test]
    fn no_placeholder_uses_single_correct_answer() {
        let q = normalize(
            &raw(json!({"question": "Name the colour of the sky", "correct_answer": "blue"})),
            QuestionType::FillInTheBlank,
        );
        let QuestionBody::FillInTheBlank { blanks, .. } = q.body else { panic!("wrong body") };
        assert_eq!(blanks.len(), 1);
        assert_eq!(blanks[0].answer, "blue");
    }

    #[test]
    fn explicit_blanks_are_kept() {
        let q = normalize(
            &raw(json!({
                "question": "____ ____",
                "blanks": [{"id": "b1", "answer": "x"}, {"id": 7}, "z"],
                "correct_answers": ["p", "q", "r"]
            })),
            QuestionType::FillInTheBlank,
        );
        let QuestionBody::FillInTheBlank { blanks, .. } = q.body else { panic!("wrong body") };
        assert_eq!(
            blanks,
            vec![
                Blank { id: "b1".into(), answer: "x".into() },
                Blank { id: "7".into(), answer: "q".into() },
                Blank { id: "2".into(), answer: "z".into() },
            ]
        );
    }

    #[test]
    fn short_answer_defaults() {
        let q = normalize(&raw(json!({"correct_answer": "Paris"})), QuestionType::ShortAnswer);
        assert_eq!(
            q.body,
            QuestionBody::ShortAnswer {
                correct_answer: "Paris".into(),
                alternative_answers: vec![],
                case_sensitive: false,
            }
        );
    }

    #[test]
    fn descriptive_keywords_split_and_trimmed() {
        let q = normalize(
            &raw(json!({"answer_keywords": " ocean , ship,, "})),
            QuestionType::Descriptive,
        );
        assert_eq!(
            q.body,
            QuestionBody::Descriptive {
                answer_keywords: vec!["ocean".into(), "ship".into()],
                model_answer: String::new(),
            }
        );
    }

    #[test]
    fn input_is_not_mutated() {
        let original = raw(json!({"question": "Q", "answer_keywords": "a,b"}));
        let copy = original.clone();
        let _ = normalize(&original, QuestionType::Descriptive);
        assert_eq!(original, copy);
    }
}

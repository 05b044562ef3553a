//! Answer comparators, one per question type. None of them panic: an answer
//! of the wrong shape is simply not correct.

use crate::models::{Blank, NormalizedQuestion, QuestionBody};
use crate::normalize::{truthy, value_text};
use serde_json::{Map, Value};

fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Option keys compare as text; a single uppercase letter stands for its
/// 1-based position, so "A" and "1" name the same option.
fn choice_key(value: &Value) -> Option<String> {
    let text = value_text(value)?;
    let text = text.trim();
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (None, _) => None,
        (Some(c), None) if c.is_ascii_uppercase() => Some((c as u8 - b'A' + 1).to_string()),
        _ => Some(text.to_string()),
    }
}

pub fn multiple_choice(answer: &Value, reference: &Value) -> bool {
    match (choice_key(answer), choice_key(reference)) {
        (Some(given), Some(expected)) => given == expected,
        _ => false,
    }
}

pub fn true_false(answer: &Value, reference: &Value) -> bool {
    truthy(answer) == truthy(reference)
}

pub fn sequence(answer: &Value, reference: &[Value]) -> bool {
    match answer.as_array() {
        Some(given) => given.len() == reference.len() && given.iter().zip(reference).all(|(a, b)| a == b),
        None => false,
    }
}

fn blank_reference<'a>(blanks: &'a [Blank], correct_answers: &'a [String], idx: usize) -> Option<&'a str> {
    blanks
        .get(idx)
        .map(|b| b.answer.as_str())
        .filter(|a| !a.trim().is_empty())
        .or_else(|| correct_answers.get(idx).map(String::as_str))
        .filter(|a| !a.trim().is_empty())
}

fn blank_matches(given: Option<String>, expected: Option<&str>) -> bool {
    match (given, expected) {
        (Some(given), Some(expected)) => fold(&given) == fold(expected),
        _ => false,
    }
}

// Entries are taken in the order they were sent. A key naming a blank id
// targets that blank; any other key targets the blank at the entry's
// position. Every entry needs a reference to match against.
fn keyed_blanks(answers: &Map<String, Value>, blanks: &[Blank], correct_answers: &[String]) -> bool {
    if answers.is_empty() {
        return false;
    }
    answers.iter().enumerate().all(|(idx, (key, given))| {
        let slot = blanks.iter().position(|b| &b.id == key).unwrap_or(idx);
        blank_matches(value_text(given), blank_reference(blanks, correct_answers, slot))
    })
}

pub fn fill_in_the_blank(answer: &Value, blanks: &[Blank], correct_answers: &[String]) -> bool {
    match answer {
        Value::Object(answers) => keyed_blanks(answers, blanks, correct_answers),
        other => blank_matches(value_text(other), blank_reference(blanks, correct_answers, 0)),
    }
}

pub fn short_answer(answer: &Value, reference: &str, alternatives: &[String], case_sensitive: bool) -> bool {
    let prepare = |s: &str| {
        if case_sensitive {
            s.trim().to_string()
        } else {
            fold(s)
        }
    };
    let Some(given) = value_text(answer).map(|s| prepare(&s)) else {
        return false;
    };
    if given.is_empty() {
        return false;
    }
    std::iter::once(reference)
        .chain(alternatives.iter().map(String::as_str))
        .map(prepare)
        .any(|accepted| accepted == given)
}

/// Passes when at least half of the keywords (rounded up) appear in the
/// answer. An empty keyword list never passes.
pub fn descriptive(answer: &Value, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let Some(text) = value_text(answer).map(|s| s.to_lowercase()) else {
        return false;
    };
    let hits = keywords
        .iter()
        .filter(|k| text.contains(&k.to_lowercase()))
        .count();
    hits >= keywords.len().div_ceil(2)
}

pub fn grade(question: &NormalizedQuestion, answer: &Value) -> bool {
    match &question.body {
        QuestionBody::MultipleChoice { correct_answer } => multiple_choice(answer, correct_answer),
        QuestionBody::TrueFalse { correct_answer } => true_false(answer, &Value::Bool(*correct_answer)),
        QuestionBody::Sequence { correct_sequence, .. } => sequence(answer, correct_sequence),
        QuestionBody::FillInTheBlank { blanks, correct_answers } => {
            fill_in_the_blank(answer, blanks, correct_answers)
        }
        QuestionBody::ShortAnswer {
            correct_answer,
            alternative_answers,
            case_sensitive,
        } => short_answer(answer, correct_answer, alternative_answers, *case_sensitive),
        QuestionBody::Descriptive { answer_keywords, .. } => descriptive(answer, answer_keywords),
    }
}

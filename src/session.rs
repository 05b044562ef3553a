use crate::detect::detect;
use crate::error::{QuizError, SessionError};
use crate::grading::grade;
use crate::models::{NormalizedQuestion, QuestionPrompt, QuestionType, RawQuestion};
use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Human labels that accompany a payload. Only consulted when the payload
/// does not name its own type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeHints {
    #[serde(rename = "displayType")]
    pub display_type: Option<String>,
    pub name: Option<String>,
}

impl TypeHints {
    fn text(&self) -> Option<String> {
        let parts: Vec<&str> = [self.display_type.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// The parsed `{ type?, questions }` envelope, or a lone question.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    pub declared_type: Option<QuestionType>,
    pub questions: Vec<RawQuestion>,
}

impl QuestionSet {
    pub fn parse(raw_json: Option<&str>) -> Result<Self, QuizError> {
        let raw = raw_json
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(QuizError::MissingPayload)?;
        let value: Value =
            serde_json::from_str(raw).map_err(|e| QuizError::MalformedPayload(e.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(QuizError::MalformedPayload("expected a JSON object".into()));
        };

        if !map.contains_key("questions") {
            return Ok(Self {
                declared_type: None,
                questions: vec![RawQuestion(map)],
            });
        }

        let declared_type = map
            .get("type")
            .and_then(Value::as_str)
            .and_then(QuestionType::from_tag);
        let questions = match map.remove("questions") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::Object(q) => Ok(RawQuestion(q)),
                    _ => Err(QuizError::MalformedPayload(format!("questions[{idx}] is not an object"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(QuizError::MalformedPayload("questions must be an array".into())),
        };
        if questions.is_empty() {
            return Err(QuizError::MalformedPayload("questions must not be empty".into()));
        }
        Ok(Self { declared_type, questions })
    }

    /// One type governs the whole set: the declared one, otherwise whatever
    /// the first question looks like.
    pub fn resolve_type(&self, hints: &TypeHints) -> QuestionType {
        if let Some(ty) = self.declared_type {
            return ty;
        }
        let hint = hints.text();
        self.questions
            .first()
            .map(|q| detect(q, hint.as_deref()))
            .unwrap_or(QuestionType::MultipleChoice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    /// Questions that have been graded.
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub question_type: QuestionType,
    pub index: usize,
    pub total: usize,
    pub question: QuestionPrompt,
    pub answer: Option<Value>,
    pub show_result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub has_prev: bool,
    pub has_next: bool,
}

/// A quiz being solved. Holds one answer slot and one graded outcome per
/// question; both vectors always match the question count.
#[derive(Debug, Clone)]
pub struct QuizSession {
    question_type: QuestionType,
    questions: Vec<NormalizedQuestion>,
    current: usize,
    answers: Vec<Option<Value>>,
    outcomes: Vec<Option<bool>>,
    show_result: bool,
}

impl QuizSession {
    pub fn load(raw_json: Option<&str>, hints: &TypeHints) -> Result<Self, QuizError> {
        let set = QuestionSet::parse(raw_json)?;
        let question_type = set.resolve_type(hints);
        let questions: Vec<NormalizedQuestion> = set
            .questions
            .iter()
            .map(|q| normalize(q, question_type))
            .collect();
        Ok(Self::from_questions(question_type, questions))
    }

    fn from_questions(question_type: QuestionType, questions: Vec<NormalizedQuestion>) -> Self {
        let len = questions.len();
        Self {
            question_type,
            questions,
            current: 0,
            answers: vec![None; len],
            outcomes: vec![None; len],
            show_result: false,
        }
    }

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &NormalizedQuestion {
        &self.questions[self.current]
    }

    pub fn current_answer(&self) -> Option<&Value> {
        self.answers[self.current].as_ref()
    }

    pub fn answer_at(&self, index: usize) -> Option<&Value> {
        self.answers.get(index).and_then(Option::as_ref)
    }

    pub fn show_result(&self) -> bool {
        self.show_result
    }

    pub fn submit_answer(&mut self, value: Value) -> Result<(), SessionError> {
        if self.show_result {
            return Err(SessionError::AlreadyRevealed);
        }
        self.answers[self.current] = if value.is_null() { None } else { Some(value) };
        Ok(())
    }

    /// Freezes the current answer and grades it. Revealing again returns the
    /// same outcome without regrading.
    pub fn reveal(&mut self) -> Result<bool, SessionError> {
        if self.show_result {
            if let Some(outcome) = self.outcomes[self.current] {
                return Ok(outcome);
            }
        }
        let question = &self.questions[self.current];
        let answer = self.answers[self.current].as_ref().ok_or(SessionError::NoAnswer)?;
        if question.is_free_text() && answer.as_str().map(|s| s.trim().is_empty()).unwrap_or(false) {
            return Err(SessionError::NoAnswer);
        }
        let outcome = grade(question, answer);
        self.outcomes[self.current] = Some(outcome);
        self.show_result = true;
        Ok(outcome)
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        if self.current + 1 >= self.questions.len() {
            return Err(SessionError::OutOfBounds);
        }
        self.move_to(self.current + 1);
        Ok(self.current)
    }

    pub fn prev(&mut self) -> Result<usize, SessionError> {
        if self.current == 0 {
            return Err(SessionError::OutOfBounds);
        }
        self.move_to(self.current - 1);
        Ok(self.current)
    }

    // Answers do not survive navigation: the destination slot starts empty.
    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.answers[index] = None;
        self.outcomes[index] = None;
        self.show_result = false;
    }

    pub fn score(&self) -> Score {
        Score {
            correct: self.outcomes.iter().filter(|o| **o == Some(true)).count(),
            answered: self.outcomes.iter().filter(|o| o.is_some()).count(),
            total: self.questions.len(),
        }
    }

    pub fn view(&self) -> SessionView {
        let question = self.current_question();
        let revealed = self.show_result;
        SessionView {
            question_type: self.question_type,
            index: self.current,
            total: self.questions.len(),
            question: QuestionPrompt::from(question),
            answer: self.current_answer().cloned(),
            show_result: revealed,
            correct: if revealed { self.outcomes[self.current] } else { None },
            reference: revealed.then(|| question.reference()),
            explanation: if revealed { question.explanation.clone() } else { None },
            has_prev: self.current > 0,
            has_next: self.current + 1 < self.questions.len(),
        }
    }
}

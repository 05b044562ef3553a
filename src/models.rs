use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Sequence,
    FillInTheBlank,
    ShortAnswer,
    Descriptive,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::Sequence,
        QuestionType::FillInTheBlank,
        QuestionType::ShortAnswer,
        QuestionType::Descriptive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Sequence => "sequence",
            QuestionType::FillInTheBlank => "fill_in_the_blank",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Descriptive => "descriptive",
        }
    }

    /// Parses an explicit type label as producers write it. Unknown labels
    /// yield `None` so the caller can fall back to field-based detection.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let key: String = tag
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match key.as_str() {
            "multiple_choice" | "multiplechoice" | "choice" => Some(QuestionType::MultipleChoice),
            "true_false" | "truefalse" | "true/false" | "ox" | "o/x" => Some(QuestionType::TrueFalse),
            "sequence" | "ordering" => Some(QuestionType::Sequence),
            "fill_in_the_blank" | "fill_in_blank" | "fill_blank" | "blank" => {
                Some(QuestionType::FillInTheBlank)
            }
            "short_answer" | "shortanswer" => Some(QuestionType::ShortAnswer),
            "descriptive" | "essay" => Some(QuestionType::Descriptive),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question exactly as an upstream producer emitted it. Field names vary
/// between producers, so nothing is typed and nothing is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RawQuestion(pub Map<String, Value>);

impl RawQuestion {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn array_field(&self, field: &str) -> Option<&Vec<Value>> {
        self.get(field).and_then(Value::as_array)
    }

    /// `question_text`, falling back to the legacy `question` field.
    pub fn text(&self) -> Option<&str> {
        self.str_field("question_text")
            .or_else(|| self.str_field("question"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blank {
    pub id: String,
    pub answer: String,
}

/// Per-type reference answer, one variant per [`QuestionType`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionBody {
    MultipleChoice {
        correct_answer: Value,
    },
    TrueFalse {
        correct_answer: bool,
    },
    Sequence {
        items: Vec<Value>,
        correct_sequence: Vec<Value>,
    },
    FillInTheBlank {
        blanks: Vec<Blank>,
        correct_answers: Vec<String>,
    },
    ShortAnswer {
        correct_answer: String,
        alternative_answers: Vec<String>,
        case_sensitive: bool,
    },
    Descriptive {
        answer_keywords: Vec<String>,
        model_answer: String,
    },
}

impl QuestionBody {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionBody::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionBody::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionBody::Sequence { .. } => QuestionType::Sequence,
            QuestionBody::FillInTheBlank { .. } => QuestionType::FillInTheBlank,
            QuestionBody::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionBody::Descriptive { .. } => QuestionType::Descriptive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedQuestion {
    pub question_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub body: QuestionBody,
}

impl NormalizedQuestion {
    pub fn question_type(&self) -> QuestionType {
        self.body.question_type()
    }

    /// The reference answer in the shape the result panel displays.
    pub fn reference(&self) -> Value {
        match &self.body {
            QuestionBody::MultipleChoice { correct_answer } => correct_answer.clone(),
            QuestionBody::TrueFalse { correct_answer } => Value::Bool(*correct_answer),
            QuestionBody::Sequence { correct_sequence, .. } => Value::Array(correct_sequence.clone()),
            QuestionBody::FillInTheBlank { blanks, .. } => Value::Array(
                blanks
                    .iter()
                    .map(|b| serde_json::json!({ "id": b.id, "answer": b.answer }))
                    .collect(),
            ),
            QuestionBody::ShortAnswer { correct_answer, .. } => Value::String(correct_answer.clone()),
            QuestionBody::Descriptive { model_answer, answer_keywords } => serde_json::json!({
                "model_answer": model_answer,
                "answer_keywords": answer_keywords,
            }),
        }
    }

    /// Free-text types refuse a blank answer at reveal time.
    pub fn is_free_text(&self) -> bool {
        matches!(
            self.body,
            QuestionBody::ShortAnswer { .. } | QuestionBody::Descriptive { .. }
        )
    }
}

/// Everything the solving view needs before the reference answer is shown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPrompt {
    pub question_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub items: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub blank_ids: Vec<String>,
}

impl From<&NormalizedQuestion> for QuestionPrompt {
    fn from(q: &NormalizedQuestion) -> Self {
        let (items, blank_ids) = match &q.body {
            QuestionBody::Sequence { items, .. } => (items.clone(), Vec::new()),
            QuestionBody::FillInTheBlank { blanks, .. } => {
                (Vec::new(), blanks.iter().map(|b| b.id.clone()).collect())
            }
            _ => (Vec::new(), Vec::new()),
        };
        Self {
            question_text: q.question_text.clone(),
            options: q.options.clone(),
            items,
            blank_ids,
        }
    }
}

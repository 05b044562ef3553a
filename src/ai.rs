use crate::config::AiSettings;
use crate::models::QuestionType;
use futures::future::BoxFuture;
use serde_json::json;

/// External summary and question generators. Each call is one request with
/// no retry; the caller decides what a failure means.
pub trait AiClient: Send + Sync {
    fn generate_summary(&self, text: &str) -> BoxFuture<'static, anyhow::Result<String>>;

    fn generate_questions(
        &self,
        text: &str,
        question_type: Option<QuestionType>,
        question_count: usize,
    ) -> BoxFuture<'static, anyhow::Result<String>>;
}

/// Models like to wrap JSON in a markdown fence.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn topic_of(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().take(6).collect();
    if words.is_empty() {
        "the material".to_string()
    } else {
        words.join(" ")
    }
}

#[derive(Clone)]
pub struct MockAiClient;

impl MockAiClient {
    fn sample_question(topic: &str, ty: QuestionType, idx: usize) -> serde_json::Value {
        let n = idx + 1;
        match ty {
            QuestionType::MultipleChoice => json!({
                "question_text": format!("{}: question {}", topic, n),
                "options": ["Correct", "Incorrect", "Unrelated", "Unknown"],
                "correct_answer": "A",
                "explanation": "Generated offline."
            }),
            QuestionType::TrueFalse => json!({
                "question_text": format!("{} is covered by statement {}", topic, n),
                "correct_answer": "true"
            }),
            QuestionType::Sequence => json!({
                "question_text": format!("Order the steps of {} ({})", topic, n),
                "items": ["first", "second", "third"],
                "correct_sequence": ["first", "second", "third"]
            }),
            QuestionType::FillInTheBlank => json!({
                "question_text": format!("The main subject of ____ is {} ({})", topic, n),
                "correct_answers": ["this text"]
            }),
            QuestionType::ShortAnswer => json!({
                "question_text": format!("Name the topic of passage {}", n),
                "correct_answer": topic,
                "alternative_answers": []
            }),
            QuestionType::Descriptive => json!({
                "question_text": format!("Explain {} in your own words ({})", topic, n),
                "answer_keywords": topic.split_whitespace().take(4).collect::<Vec<_>>().join(", "),
                "model_answer": format!("A short explanation of {}.", topic)
            }),
        }
    }
}

impl AiClient for MockAiClient {
    fn generate_summary(&self, text: &str) -> BoxFuture<'static, anyhow::Result<String>> {
        let summary = text
            .split_terminator(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(2)
            .map(|s| format!("{}.", s))
            .collect::<Vec<_>>()
            .join(" ");
        Box::pin(async move {
            if summary.is_empty() {
                anyhow::bail!("nothing to summarize");
            }
            Ok(summary)
        })
    }

    fn generate_questions(
        &self,
        text: &str,
        question_type: Option<QuestionType>,
        question_count: usize,
    ) -> BoxFuture<'static, anyhow::Result<String>> {
        let topic = topic_of(text);
        let ty = question_type.unwrap_or(QuestionType::MultipleChoice);
        Box::pin(async move {
            let questions: Vec<_> = (0..question_count.max(1))
                .map(|idx| MockAiClient::sample_question(&topic, ty, idx))
                .collect();
            let payload = json!({
                "type": ty.as_str(),
                "questions": questions
            });
            Ok(format!("```json\n{}\n```", payload))
        })
    }
}

#[derive(Clone)]
pub struct HttpAiClient {
    http: reqwest::Client,
    settings: AiSettings,
}

impl HttpAiClient {
    pub fn new(settings: AiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn post(&self, path: &str, body: serde_json::Value) -> BoxFuture<'static, anyhow::Result<String>> {
        let url = format!("{}/{}", self.settings.base_url, path);
        let mut request = self.http.post(url).json(&body);
        if let Some(auth) = &self.settings.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth.clone());
        }
        Box::pin(async move {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                anyhow::bail!("ai service answered {}: {}", status, text.trim());
            }
            let cleaned = strip_code_fence(&text);
            if cleaned.is_empty() {
                anyhow::bail!("ai service returned empty content");
            }
            Ok(cleaned)
        })
    }
}

impl AiClient for HttpAiClient {
    fn generate_summary(&self, text: &str) -> BoxFuture<'static, anyhow::Result<String>> {
        let call = self.post("summary", json!({ "text": text }));
        Box::pin(async move {
            let body = call.await?;
            // The service may answer `{"summary": "..."}` or plain text.
            let summary = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("summary").and_then(|s| s.as_str()).map(str::to_string))
                .unwrap_or(body);
            Ok(summary)
        })
    }

    fn generate_questions(
        &self,
        text: &str,
        question_type: Option<QuestionType>,
        question_count: usize,
    ) -> BoxFuture<'static, anyhow::Result<String>> {
        self.post(
            "questions",
            json!({
                "text": text,
                "questionType": question_type.map(|t| t.as_str()),
                "questionCount": question_count.max(1),
            }),
        )
    }
}

use axum::{response::{IntoResponse, Response}, Json};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Ingestion failures. Either one halts the quiz before anything renders.
#[derive(Debug, Error, PartialEq)]
pub enum QuizError {
    #[error("no question payload was provided")]
    MissingPayload,
    #[error("question payload is malformed: {0}")]
    MalformedPayload(String),
}

impl QuizError {
    pub fn code(&self) -> &'static str {
        match self {
            QuizError::MissingPayload => "MISSING_PAYLOAD",
            QuizError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
        }
    }

    /// Static text shown to the person solving the quiz.
    pub fn user_message(&self) -> &'static str {
        match self {
            QuizError::MissingPayload => "No quiz data was found. Please generate the questions again.",
            QuizError::MalformedPayload(_) => "The quiz data could not be read. Please generate the questions again.",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("the answer is already revealed")]
    AlreadyRevealed,
    #[error("there is no answer to reveal")]
    NoAnswer,
    #[error("no question in that direction")]
    OutOfBounds,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub issue: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Vec<ErrorDetail>,
    pub request_id: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Vec::new(),
            request_id: request_id.into(),
        }
    }

    pub fn with_details(mut self, details: Vec<ErrorDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn not_found(what: &str, request_id: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found"), request_id)
    }

    pub fn quiz(err: &QuizError, request_id: impl Into<String>) -> Self {
        let mut app = Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.code(), err.user_message(), request_id);
        if let QuizError::MalformedPayload(reason) = err {
            app.details.push(ErrorDetail {
                field: "rawJson".into(),
                issue: reason.clone(),
            });
        }
        app
    }

    pub fn session(err: SessionError, request_id: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string(), request_id)
    }

    pub fn validation(errors: &validator::ValidationErrors, request_id: impl Into<String>) -> Self {
        let mut details: Vec<ErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ErrorDetail {
                    field: field.to_string(),
                    issue: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "request validation failed", request_id)
            .with_details(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let payload = ErrorBody {
            error: ErrorPayload {
                code: self.code,
                message: self.message,
                details: self.details,
                request_id: self.request_id,
            },
        };
        (self.status, Json(payload)).into_response()
    }
}

use crate::ai::strip_code_fence;
use crate::error::{AppError, ErrorDetail, SessionError};
use crate::models::QuestionType;
use crate::session::{QuizSession, Score, SessionView, TypeHints};
use crate::state::{AppState, SavedQuestionSet, SavedSummary};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub view: SessionView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionPayload {
    pub raw_json: Option<String>,
    pub display_type: Option<String>,
    pub name: Option<String>,
}

fn open_session(
    state: &AppState,
    raw_json: Option<&str>,
    hints: &TypeHints,
    req_id: &str,
) -> Result<SessionResponse, AppError> {
    let session = QuizSession::load(raw_json, hints).map_err(|err| {
        warn!("quiz payload rejected: {}", err);
        AppError::quiz(&err, req_id)
    })?;
    let view = session.view();
    let session_id = state.open_session(session);
    info!(
        "quiz session {} opened: {} x {}",
        session_id, view.total, view.question_type
    );
    Ok(SessionResponse { session_id, view })
}

pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let req_id = request_id_from_headers(&headers);
    let hints = TypeHints {
        display_type: payload.display_type,
        name: payload.name,
    };
    let response = open_session(&state, payload.raw_json.as_deref(), &hints, &req_id)?;
    Ok((StatusCode::CREATED, Json(response)))
}

fn with_session<T>(
    state: &AppState,
    id: Uuid,
    req_id: &str,
    f: impl FnOnce(&mut QuizSession) -> Result<T, SessionError>,
) -> Result<(T, SessionView), AppError> {
    let mut entry = state
        .db
        .sessions
        .get_mut(&id)
        .ok_or_else(|| AppError::not_found("session", req_id))?;
    entry.touched = Instant::now();
    let out = f(&mut entry.session).map_err(|err| AppError::session(err, req_id))?;
    Ok((out, entry.session.view()))
}

pub async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let ((), view) = with_session(&state, id, &req_id, |_| Ok(()))?;
    Ok(Json(SessionResponse { session_id: id, view }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let req_id = request_id_from_headers(&headers);
    state
        .db
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::not_found("session", req_id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AnswerPayload {
    #[serde(default)]
    pub answer: Value,
}

pub async fn submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<SessionResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let ((), view) = with_session(&state, id, &req_id, |s| s.submit_answer(payload.answer))?;
    Ok(Json(SessionResponse { session_id: id, view }))
}

pub async fn reveal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let (correct, view) = with_session(&state, id, &req_id, QuizSession::reveal)?;
    info!("quiz session {} question {} revealed: correct={}", id, view.index, correct);
    Ok(Json(SessionResponse { session_id: id, view }))
}

pub async fn next_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let (_, view) = with_session(&state, id, &req_id, QuizSession::next)?;
    Ok(Json(SessionResponse { session_id: id, view }))
}

pub async fn prev_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let (_, view) = with_session(&state, id, &req_id, QuizSession::prev)?;
    Ok(Json(SessionResponse { session_id: id, view }))
}

pub async fn session_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Score>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let (score, _) = with_session(&state, id, &req_id, |s| Ok(s.score()))?;
    Ok(Json(score))
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct SummaryPayload {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100000, message = "must be at most 100000 characters")
    )]
    pub text: String,
}

pub async fn ai_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SummaryPayload>,
) -> Result<Json<Value>, AppError> {
    let req_id = request_id_from_headers(&headers);
    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, req_id.clone()))?;
    let summary = state
        .ai_client
        .generate_summary(&payload.text)
        .await
        .map_err(|e| {
            warn!("summary generation failed: {}", e);
            AppError::new(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                format!("summary generation failed: {}", e),
                req_id.clone(),
            )
        })?;
    Ok(Json(json!({ "summary": summary })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsPayload {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100000, message = "must be at most 100000 characters")
    )]
    pub text: String,
    pub question_type: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub question_count: usize,
}

pub async fn ai_questions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<QuestionsPayload>,
) -> Result<Json<Value>, AppError> {
    let req_id = request_id_from_headers(&headers);
    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, req_id.clone()))?;
    let requested_type = match payload.question_type.as_deref() {
        None => None,
        Some(tag) => Some(QuestionType::from_tag(tag).ok_or_else(|| {
            AppError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "request validation failed", req_id.clone())
                .with_details(vec![ErrorDetail {
                    field: "questionType".into(),
                    issue: format!("unknown question type {tag:?}"),
                }])
        })?),
    };

    let compiled = jsonschema::draft202012::new(&state.question_schema)
        .map_err(|_| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "schema build failed", req_id.clone()))?;
    let hints = TypeHints {
        display_type: requested_type.map(|t| t.as_str().to_string()),
        name: None,
    };
    let mut last_validation_details: Vec<ErrorDetail> = Vec::new();
    let mut last_message = "generated questions do not match schema".to_string();

    for _attempt in 0..2 {
        let raw = state
            .ai_client
            .generate_questions(&payload.text, requested_type, payload.question_count)
            .await
            .map_err(|e| {
                warn!("question generation failed: {}", e);
                AppError::new(
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    format!("question generation failed: {}", e),
                    req_id.clone(),
                )
            })?;
        let raw = strip_code_fence(&raw);

        let json_value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                last_message = format!("generated questions are not valid json: {}", e);
                last_validation_details.clear();
                continue;
            }
        };

        if compiled.validate(&json_value).is_err() {
            last_validation_details = compiled
                .iter_errors(&json_value)
                .map(|e| ErrorDetail {
                    field: e.instance_path.to_string(),
                    issue: e.to_string(),
                })
                .collect();
            last_message = "generated questions do not match schema".to_string();
            continue;
        }

        let session = match QuizSession::load(Some(&raw), &hints) {
            Ok(s) => s,
            Err(e) => {
                last_message = e.to_string();
                last_validation_details.clear();
                continue;
            }
        };

        return Ok(Json(json!({
            "rawJson": raw,
            "questionType": session.question_type(),
            "questionCount": session.len(),
        })));
    }

    Err(AppError::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        "VALIDATION_ERROR",
        last_message,
        req_id,
    )
    .with_details(last_validation_details))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveSummaryPayload {
    #[validate(
        custom(function = "not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
}

pub async fn save_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SaveSummaryPayload>,
) -> Result<(StatusCode, Json<SavedSummary>), AppError> {
    let req_id = request_id_from_headers(&headers);
    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, req_id))?;
    let saved = state
        .save_summary(payload.title.trim().to_string(), payload.content)
        .await;
    info!("summary {} saved", saved.id);
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list_summaries(State(state): State<AppState>) -> Json<Value> {
    let summaries = state.db.summaries.read().await;
    let mut items: Vec<&SavedSummary> = summaries.values().collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(json!({ "items": items, "total": items.len() }))
}

pub async fn export_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let req_id = request_id_from_headers(&headers);
    let summary = state
        .db
        .summaries
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::not_found("summary", req_id))?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        summary.to_markdown(),
    ))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuestionSetPayload {
    #[validate(
        custom(function = "not_blank"),
        length(max = 200, message = "must be at most 200 characters")
    )]
    pub title: String,
    pub raw_json: Option<String>,
    pub display_type: Option<String>,
}

pub async fn save_question_set(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SaveQuestionSetPayload>,
) -> Result<(StatusCode, Json<SavedQuestionSet>), AppError> {
    let req_id = request_id_from_headers(&headers);
    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, req_id.clone()))?;
    let hints = TypeHints {
        display_type: payload.display_type.clone(),
        name: Some(payload.title.clone()),
    };
    let session = QuizSession::load(payload.raw_json.as_deref(), &hints)
        .map_err(|err| AppError::quiz(&err, req_id))?;
    let saved = state
        .save_question_set(
            payload.title.trim().to_string(),
            &session,
            payload.raw_json.unwrap_or_default(),
            payload.display_type,
        )
        .await;
    info!("question set {} saved ({} x {})", saved.id, saved.question_count, saved.question_type);
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list_question_sets(State(state): State<AppState>) -> Json<Value> {
    let sets = state.db.question_sets.read().await;
    let mut items: Vec<&SavedQuestionSet> = sets.values().collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(json!({ "items": items, "total": items.len() }))
}

pub async fn start_saved_question_set(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let req_id = request_id_from_headers(&headers);
    let saved = state
        .db
        .question_sets
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::not_found("question set", req_id.clone()))?;
    let hints = TypeHints {
        display_type: saved.display_type,
        name: Some(saved.title),
    };
    let response = open_session(&state, Some(&saved.raw_json), &hints, &req_id)?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues(errors: &validator::ValidationErrors, field: &str) -> Vec<String> {
        errors.field_errors()[field]
            .iter()
            .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn whitespace_title_is_blank() {
        let payload = SaveSummaryPayload {
            title: "   ".into(),
            content: "Cells divide.".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert_eq!(issues(&errors, "title"), vec!["must not be blank".to_string()]);

        let payload = SaveQuestionSetPayload {
            title: "\t\n".into(),
            raw_json: None,
            display_type: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn overlong_fields_report_the_limit() {
        let payload = SaveSummaryPayload {
            title: "t".repeat(201),
            content: "body".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert_eq!(issues(&errors, "title"), vec!["must be at most 200 characters".to_string()]);

        let payload = SummaryPayload { text: "x".repeat(100_001) };
        let errors = payload.validate().unwrap_err();
        assert_eq!(issues(&errors, "text"), vec!["must be at most 100000 characters".to_string()]);
    }

    #[test]
    fn padded_title_passes() {
        let payload = SaveSummaryPayload {
            title: "  Mitosis ".into(),
            content: " ... ".into(),
        };
        assert!(payload.validate().is_ok());
    }
}

use crate::handlers;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/quiz-sessions", post(handlers::create_session))
        .route(
            "/api/v1/quiz-sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/api/v1/quiz-sessions/:id/answer", post(handlers::submit_answer))
        .route("/api/v1/quiz-sessions/:id/reveal", post(handlers::reveal))
        .route("/api/v1/quiz-sessions/:id/next", post(handlers::next_question))
        .route("/api/v1/quiz-sessions/:id/prev", post(handlers::prev_question))
        .route("/api/v1/quiz-sessions/:id/score", get(handlers::session_score))
        .route("/api/v1/ai/summary", post(handlers::ai_summary))
        .route("/api/v1/ai/questions", post(handlers::ai_questions))
        .route(
            "/api/v1/saved/summaries",
            post(handlers::save_summary).get(handlers::list_summaries),
        )
        .route("/api/v1/saved/summaries/:id/export", get(handlers::export_summary))
        .route(
            "/api/v1/saved/question-sets",
            post(handlers::save_question_set).get(handlers::list_question_sets),
        )
        .route(
            "/api/v1/saved/question-sets/:id/session",
            post(handlers::start_saved_question_set),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

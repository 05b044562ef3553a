pub mod ai;
pub mod config;
pub mod detect;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod routes;
pub mod session;
pub mod state;

use std::sync::Arc;

pub fn build_state(config: &config::AppConfig) -> anyhow::Result<state::AppState> {
    let schema_raw = include_str!("../contracts/question_set.schema.json");
    let schema: serde_json::Value = serde_json::from_str(schema_raw)?;
    let ai_client: Arc<dyn ai::AiClient> = match config.ai.clone() {
        Some(settings) => Arc::new(ai::HttpAiClient::new(settings)),
        None => Arc::new(ai::MockAiClient),
    };
    Ok(
        state::AppState::new(ai_client, schema, config.local_state_path.clone())
            .with_session_limits(config.sessions),
    )
}

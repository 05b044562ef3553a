use crate::ai::AiClient;
use crate::config::SessionLimits;
use crate::models::QuestionType;
use crate::session::QuizSession;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use std::{fs, path::Path};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSummary {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SavedSummary {
    pub fn to_markdown(&self) -> String {
        format!(
            "# {}\n\n_Saved {}_\n\n{}\n",
            self.title,
            self.created_at.format("%Y-%m-%d %H:%M UTC"),
            self.content.trim()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuestionSet {
    pub id: Uuid,
    pub title: String,
    pub question_type: QuestionType,
    pub question_count: usize,
    pub raw_json: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct SessionEntry {
    pub session: QuizSession,
    pub touched: Instant,
}

pub struct InMemoryDb {
    pub summaries: RwLock<HashMap<Uuid, SavedSummary>>,
    pub question_sets: RwLock<HashMap<Uuid, SavedQuestionSet>>,
    pub sessions: DashMap<Uuid, SessionEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistentSnapshot {
    summaries: HashMap<Uuid, SavedSummary>,
    question_sets: HashMap<Uuid, SavedQuestionSet>,
}

impl InMemoryDb {
    pub fn new(snapshot_path: Option<&str>) -> Self {
        let snapshot = snapshot_path
            .and_then(|path| {
                let raw = fs::read_to_string(path).ok()?;
                match serde_json::from_str::<PersistentSnapshot>(&raw) {
                    Ok(s) => Some(s),
                    Err(err) => {
                        warn!("failed to read local snapshot {}: {}", path, err);
                        None
                    }
                }
            })
            .unwrap_or_default();

        Self {
            summaries: RwLock::new(snapshot.summaries),
            question_sets: RwLock::new(snapshot.question_sets),
            sessions: DashMap::new(),
        }
    }

    async fn snapshot(&self) -> PersistentSnapshot {
        PersistentSnapshot {
            summaries: self.summaries.read().await.clone(),
            question_sets: self.question_sets.read().await.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<InMemoryDb>,
    pub ai_client: Arc<dyn AiClient>,
    pub question_schema: Arc<serde_json::Value>,
    pub local_state_path: Option<String>,
    pub session_limits: SessionLimits,
}

impl AppState {
    pub fn new(
        ai_client: Arc<dyn AiClient>,
        question_schema: serde_json::Value,
        local_state_path: Option<String>,
    ) -> Self {
        Self {
            db: Arc::new(InMemoryDb::new(local_state_path.as_deref())),
            ai_client,
            question_schema: Arc::new(question_schema),
            local_state_path,
            session_limits: SessionLimits::default(),
        }
    }

    pub fn with_session_limits(mut self, limits: SessionLimits) -> Self {
        self.session_limits = limits;
        self
    }

    pub fn open_session(&self, session: QuizSession) -> Uuid {
        let now = Instant::now();
        self.evict_sessions(now);
        let id = Uuid::new_v4();
        self.db.sessions.insert(id, SessionEntry { session, touched: now });
        id
    }

    /// Drops idle sessions, then the least recently touched ones until a new
    /// session fits under the cap. Returns how many were dropped.
    pub fn evict_sessions(&self, now: Instant) -> usize {
        let limits = self.session_limits;
        let before = self.db.sessions.len();
        self.db
            .sessions
            .retain(|_, entry| now.saturating_duration_since(entry.touched) <= limits.idle);

        let overflow = (self.db.sessions.len() + 1).saturating_sub(limits.max_sessions);
        if overflow > 0 {
            let mut by_age: Vec<(Instant, Uuid)> = self
                .db
                .sessions
                .iter()
                .map(|entry| (entry.touched, *entry.key()))
                .collect();
            by_age.sort();
            for (_, id) in by_age.into_iter().take(overflow) {
                self.db.sessions.remove(&id);
            }
        }

        let dropped = before.saturating_sub(self.db.sessions.len());
        if dropped > 0 {
            info!("evicted {} quiz sessions", dropped);
        }
        dropped
    }

    pub async fn save_summary(&self, title: String, content: String) -> SavedSummary {
        let record = SavedSummary {
            id: Uuid::new_v4(),
            title,
            content,
            created_at: Utc::now(),
        };
        self.db.summaries.write().await.insert(record.id, record.clone());
        if let Err(err) = self.persist_core_data().await {
            warn!("failed to persist local state after save_summary: {}", err);
        }
        record
    }

    pub async fn save_question_set(
        &self,
        title: String,
        session: &QuizSession,
        raw_json: String,
        display_type: Option<String>,
    ) -> SavedQuestionSet {
        let record = SavedQuestionSet {
            id: Uuid::new_v4(),
            title,
            question_type: session.question_type(),
            question_count: session.len(),
            raw_json,
            display_type,
            created_at: Utc::now(),
        };
        self.db.question_sets.write().await.insert(record.id, record.clone());
        if let Err(err) = self.persist_core_data().await {
            warn!("failed to persist local state after save_question_set: {}", err);
        }
        record
    }

    pub async fn persist_core_data(&self) -> anyhow::Result<()> {
        let Some(path) = self.local_state_path.as_ref() else {
            return Ok(());
        };
        let snapshot = self.db.snapshot().await;
        let serialized = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serialized).await?;
        Ok(())
    }
}

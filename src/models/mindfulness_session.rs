use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MindfulnessSession {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub session_type: String,
    pub duration_seconds: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Breathing,
    Meditation,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Breathing => "breathing",
            SessionType::Meditation => "meditation",
        }
    }

    pub fn parse(s: &str) -> Option<SessionType> {
        match s {
            "breathing" => Some(SessionType::Breathing),
            "meditation" => Some(SessionType::Meditation),
            _ => None,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub mood: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    VeryHappy,
    Happy,
    Neutral,
    Sad,
    VerySad,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::VeryHappy,
        Mood::Happy,
        Mood::Neutral,
        Mood::Sad,
        Mood::VerySad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::VeryHappy => "very_happy",
            Mood::Happy => "happy",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::VerySad => "very_sad",
        }
    }

    pub fn parse(s: &str) -> Option<Mood> {
        Mood::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// Numeric score used for averages: very_sad = 1 .. very_happy = 5.
    pub fn score(&self) -> f64 {
        match self {
            Mood::VeryHappy => 5.0,
            Mood::Happy => 4.0,
            Mood::Neutral => 3.0,
            Mood::Sad => 2.0,
            Mood::VerySad => 1.0,
        }
    }
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::{Mood, MoodEntry};
use crate::state::SharedState;
use crate::timestamp;
use crate::validation;

#[derive(Deserialize)]
pub struct CreateMoodEntry {
    pub mood: Option<String>,
    pub note: Option<String>,
    pub created_at: Option<String>,
}

/// `created_at` is accepted but ignored so the original timestamp survives.
#[derive(Deserialize)]
pub struct UpdateMoodEntry {
    pub mood: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MoodCount {
    pub mood: &'static str,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct Averages {
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
    pub overall: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub average: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MoodStats {
    pub mood_counts: Vec<MoodCount>,
    pub averages: Averages,
    pub daily_breakdown: Vec<DailyBreakdown>,
    pub total_entries: usize,
}

fn parse_mood(value: Option<&str>) -> Result<Mood, AppError> {
    let Some(raw) = value.filter(|v| !v.is_empty()) else {
        return Err(AppError::field("mood", "This field is required."));
    };
    validation::validate_choice(raw, Mood::parse).map_err(|msg| AppError::field("mood", msg))
}

fn average(scores: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = scores.fold((0.0, 0usize), |(sum, n), s| (sum + s, n + 1));
    if n == 0 {
        None
    } else {
        Some((sum / n as f64 * 100.0).round() / 100.0)
    }
}

pub fn compute_stats(entries: &[MoodEntry], now: DateTime<Utc>) -> MoodStats {
    let scored: Vec<(DateTime<Utc>, Mood)> = entries
        .iter()
        .filter_map(|e| Mood::parse(&e.mood).map(|m| (e.created_at, m)))
        .collect();

    let mood_counts = Mood::ALL
        .iter()
        .map(|mood| MoodCount {
            mood: mood.as_str(),
            count: scored.iter().filter(|(_, m)| m == mood).count(),
        })
        .collect();

    let since = |days: i64| {
        let cutoff = now - Duration::days(days);
        average(
            scored
                .iter()
                .filter(move |(at, _)| *at >= cutoff)
                .map(|(_, m)| m.score()),
        )
    };

    let averages = Averages {
        weekly: since(7),
        monthly: since(30),
        overall: average(scored.iter().map(|(_, m)| m.score())),
    };

    let today = now.date_naive();
    let daily_breakdown = (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let day: Vec<f64> = scored
                .iter()
                .filter(|(at, _)| at.date_naive() == date)
                .map(|(_, m)| m.score())
                .collect();
            DailyBreakdown {
                date,
                average: average(day.iter().copied()),
                count: day.len(),
            }
        })
        .collect();

    MoodStats {
        mood_counts,
        averages,
        daily_breakdown,
        total_entries: entries.len(),
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<MoodEntry>>, AppError> {
    let entries = db::mood_entries::list(&state.pool, auth.user_id).await?;
    Ok(Json(entries))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<CreateMoodEntry>,
) -> Result<(StatusCode, Json<MoodEntry>), AppError> {
    let mood = parse_mood(req.mood.as_deref())?;
    let created_at = timestamp::resolve_created_at(req.created_at.as_deref(), Utc::now());
    let note = req.note.unwrap_or_default();

    let entry = db::mood_entries::create(
        &state.pool,
        auth.user_id,
        mood.as_str(),
        note.trim(),
        created_at,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MoodEntry>, AppError> {
    let entry = db::mood_entries::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Mood entry not found".to_string()))?;
    Ok(Json(entry))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateMoodEntry>,
) -> Result<Json<MoodEntry>, AppError> {
    let existing = db::mood_entries::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Mood entry not found".to_string()))?;

    let mood = match req.mood.as_deref() {
        Some(raw) => parse_mood(Some(raw))?.as_str().to_string(),
        None => existing.mood,
    };
    let note = req.note.map(|n| n.trim().to_string()).unwrap_or(existing.note);

    let entry = db::mood_entries::update(&state.pool, id, auth.user_id, &mood, &note).await?;
    Ok(Json(entry))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !db::mood_entries::delete(&state.pool, id, auth.user_id).await? {
        return Err(AppError::NotFound("Mood entry not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = db::mood_entries::delete_all(&state.pool, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub async fn stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<MoodStats>, AppError> {
    let entries = db::mood_entries::list(&state.pool, auth.user_id).await?;
    Ok(Json(compute_stats(&entries, Utc::now())))
}

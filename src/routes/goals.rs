use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::{Goal, GoalStatus};
use crate::state::SharedState;
use crate::validation::{self, Errors};

#[derive(Deserialize)]
pub struct GoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub status: Option<String>,
}

fn parse_target_date(raw: &str) -> Result<NaiveDate, String> {
    if raw.is_empty() {
        return Err("This field is required.".to_string());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string())
}

fn not_found() -> AppError {
    AppError::NotFound("Goal not found".to_string())
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Goal>>, AppError> {
    let goals = db::goals::list(&state.pool, auth.user_id).await?;
    Ok(Json(goals))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<GoalRequest>,
) -> Result<(StatusCode, Json<Goal>), AppError> {
    let mut errors = Errors::new();

    let title = req.title.unwrap_or_default().trim().to_string();
    errors.check("title", validation::validate_title(&title));
    let target_date = errors.take(
        "target_date",
        parse_target_date(req.target_date.as_deref().unwrap_or_default()),
    );
    let status = match req.status.as_deref() {
        None => Some(GoalStatus::default()),
        Some(raw) => errors.take("status", validation::validate_choice(raw, GoalStatus::parse)),
    };
    errors.into_result()?;

    let (Some(target_date), Some(status)) = (target_date, status) else {
        return Err(AppError::Internal("Goal fields missing after validation".to_string()));
    };
    let description = req.description.unwrap_or_default();

    let goal = db::goals::create(
        &state.pool,
        auth.user_id,
        &title,
        &description,
        target_date,
        status.as_str(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Goal>, AppError> {
    let goal = db::goals::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(goal))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<GoalRequest>,
) -> Result<Json<Goal>, AppError> {
    let existing = db::goals::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    let mut errors = Errors::new();

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(existing.title);
    errors.check("title", validation::validate_title(&title));
    let target_date = match req.target_date.as_deref() {
        None => Some(existing.target_date),
        Some(raw) => errors.take("target_date", parse_target_date(raw)),
    };
    let status = match req.status.as_deref() {
        None => Some(existing.status),
        Some(raw) => errors
            .take("status", validation::validate_choice(raw, GoalStatus::parse))
            .map(|s| s.as_str().to_string()),
    };
    errors.into_result()?;

    let (Some(target_date), Some(status)) = (target_date, status) else {
        return Err(AppError::Internal("Goal fields missing after validation".to_string()));
    };
    let description = req.description.unwrap_or(existing.description);

    let goal = db::goals::update(
        &state.pool,
        id,
        auth.user_id,
        &title,
        &description,
        target_date,
        &status,
    )
    .await?;
    Ok(Json(goal))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !db::goals::delete(&state.pool, id, auth.user_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::deserialize_some;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::tasks::TaskFields;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::{Task, TaskPriority, TaskStatus};
use crate::state::SharedState;
use crate::timestamp;
use crate::validation::{self, Errors};

#[derive(Deserialize)]
pub struct CreateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    /// Absent keeps the current value, `null` clears it.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<String>>,
}

fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, String> {
    timestamp::parse_client_timestamp(raw).ok_or_else(|| {
        "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].".to_string()
    })
}

fn not_found() -> AppError {
    AppError::NotFound("Task not found".to_string())
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = db::tasks::list(&state.pool, auth.user_id).await?;
    Ok(Json(tasks))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<CreateTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let mut errors = Errors::new();

    let title = req.title.unwrap_or_default().trim().to_string();
    errors.check("title", validation::validate_title(&title));

    let priority = match req.priority.as_deref() {
        None => Some(TaskPriority::default()),
        Some(raw) => errors.take("priority", validation::validate_choice(raw, TaskPriority::parse)),
    };
    let status = match req.status.as_deref() {
        None => Some(TaskStatus::default()),
        Some(raw) => errors.take("status", validation::validate_choice(raw, TaskStatus::parse)),
    };
    let due_date = match req.due_date.as_deref() {
        None | Some("") => None,
        Some(raw) => errors.take("due_date", parse_due_date(raw)),
    };
    errors.into_result()?;

    let (Some(priority), Some(status)) = (priority, status) else {
        return Err(AppError::Internal("Task fields missing after validation".to_string()));
    };
    let description = req.description.unwrap_or_default();

    let task = db::tasks::create(
        &state.pool,
        auth.user_id,
        &TaskFields {
            title: &title,
            description: &description,
            priority: priority.as_str(),
            status: status.as_str(),
            due_date,
        },
    )
    .await?;

    tracing::debug!(task_id = %task.id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = db::tasks::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(task))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateTask>,
) -> Result<Json<Task>, AppError> {
    let existing = db::tasks::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    let mut errors = Errors::new();

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(existing.title);
    errors.check("title", validation::validate_title(&title));

    let priority = match req.priority.as_deref() {
        None => Some(existing.priority),
        Some(raw) => errors
            .take("priority", validation::validate_choice(raw, TaskPriority::parse))
            .map(|p| p.as_str().to_string()),
    };
    let status = match req.status.as_deref() {
        None => Some(existing.status),
        Some(raw) => errors
            .take("status", validation::validate_choice(raw, TaskStatus::parse))
            .map(|s| s.as_str().to_string()),
    };
    let due_date = match req.due_date {
        None => existing.due_date,
        Some(None) => None,
        Some(Some(raw)) if raw.is_empty() => None,
        Some(Some(raw)) => errors.take("due_date", parse_due_date(&raw)),
    };
    errors.into_result()?;

    let (Some(priority), Some(status)) = (priority, status) else {
        return Err(AppError::Internal("Task fields missing after validation".to_string()));
    };
    let description = req.description.unwrap_or(existing.description);

    let task = db::tasks::update(
        &state.pool,
        id,
        auth.user_id,
        &TaskFields {
            title: &title,
            description: &description,
            priority: &priority,
            status: &status,
            due_date,
        },
    )
    .await?;
    Ok(Json(task))
}

pub async fn complete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    db::tasks::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    let task =
        db::tasks::set_status(&state.pool, id, auth.user_id, TaskStatus::Completed.as_str())
            .await?;
    Ok(Json(task))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !db::tasks::delete(&state.pool, id, auth.user_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::{MindfulnessSession, SessionType};
use crate::state::SharedState;
use crate::validation::{self, Errors};

const HISTORY_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct CreateSession {
    pub session_type: Option<String>,
    pub duration_seconds: Option<i64>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<MindfulnessSession>>, AppError> {
    let sessions =
        db::mindfulness_sessions::list_recent(&state.pool, auth.user_id, HISTORY_LIMIT).await?;
    Ok(Json(sessions))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<CreateSession>,
) -> Result<(StatusCode, Json<MindfulnessSession>), AppError> {
    let mut errors = Errors::new();

    let session_type = match req.session_type.as_deref() {
        None | Some("") => {
            errors.add("session_type", "This field is required.");
            None
        }
        Some(raw) => errors.take(
            "session_type",
            validation::validate_choice(raw, SessionType::parse),
        ),
    };
    let duration = match req.duration_seconds {
        None => {
            errors.add("duration_seconds", "This field is required.");
            None
        }
        Some(d) if d <= 0 => {
            errors.add("duration_seconds", "Duration must be positive.");
            None
        }
        Some(d) => errors.take(
            "duration_seconds",
            i32::try_from(d).map_err(|_| "Duration is too large.".to_string()),
        ),
    };
    errors.into_result()?;

    let (Some(session_type), Some(duration)) = (session_type, duration) else {
        return Err(AppError::Internal("Session fields missing after validation".to_string()));
    };

    let session = db::mindfulness_sessions::create(
        &state.pool,
        auth.user_id,
        session_type.as_str(),
        duration,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn clear(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = db::mindfulness_sessions::delete_all(&state.pool, auth.user_id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::chat::{self, HISTORY_LIMIT};
use crate::db;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::{ChatMessage, ChatRole};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub message: String,
    pub role: &'static str,
}

fn not_found() -> AppError {
    AppError::NotFound("Message not found".to_string())
}

pub async fn send(
    auth: AuthUser,
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let message = req.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let reply = chat::respond(&state, auth.user_id, message.trim()).await?;

    Ok(Json(ChatReply {
        message: reply,
        role: ChatRole::Assistant.as_str(),
    }))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let messages = db::chat_messages::list_recent(&state.pool, auth.user_id, HISTORY_LIMIT).await?;
    Ok(Json(messages))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatMessage>, AppError> {
    let message = db::chat_messages::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(message))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !db::chat_messages::delete(&state.pool, id, auth.user_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = db::chat_messages::delete_all(&state.pool, auth.user_id).await?;
    tracing::info!(user_id = %auth.user_id, deleted, "Chat history cleared");
    Ok(Json(json!({ "deleted": deleted })))
}

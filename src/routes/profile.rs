use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::User;
use crate::state::SharedState;
use crate::validation::{self, Errors};

const THEMES: &[&str] = &["light", "dark", "system"];

#[derive(Deserialize)]
pub struct UpdateProfile {
    pub username: Option<String>,
    pub theme_preference: Option<String>,
    pub notification_enabled: Option<bool>,
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
    Ok(Json(user))
}

/// Email and verification state are not editable here.
pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<UpdateProfile>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let username = req
        .username
        .map(|u| u.trim().to_string())
        .unwrap_or_else(|| user.username.clone());
    let theme = req
        .theme_preference
        .unwrap_or_else(|| user.theme_preference.clone());
    let notification_enabled = req
        .notification_enabled
        .unwrap_or(user.notification_enabled);

    let mut errors = Errors::new();
    errors.check("username", validation::validate_username(&username));
    if !THEMES.contains(&theme.as_str()) {
        errors.add(
            "theme_preference",
            format!("\"{theme}\" is not a valid choice."),
        );
    }
    if errors.is_empty()
        && db::users::username_taken(&state.pool, &username, Some(user.id)).await?
    {
        errors.add("username", "A user with that username already exists.");
    }
    errors.into_result()?;

    let updated =
        db::users::update_profile(&state.pool, user.id, &username, &theme, notification_enabled)
            .await?;
    Ok(Json(updated))
}

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{ACCESS_TOKEN_MINUTES, Claims, encode_token};
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::models::{PublicUser, User};
use crate::state::SharedState;
use crate::tokens::{self, ResetError, VerifyOutcome};
use crate::validation::{self, Errors};

const REFRESH_TOKEN_DAYS: i64 = 7;

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";
pub const INVALID_RESET_LINK: &str = "Invalid or expired password reset link";
pub const EXPIRED_RESET_LINK: &str = "Password reset link has expired. Please request a new one.";
pub const SAME_PASSWORD: &str = "New password must be different from your current password";
pub const INVALID_VERIFICATION: &str = "Invalid verification token or email";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub email: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

fn auth_cookies(access_token: &str, refresh_token: &str) -> CookieJar {
    let access = Cookie::build(("access_token", access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ACCESS_TOKEN_MINUTES))
        .build();

    let refresh = Cookie::build(("refresh_token", refresh_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(REFRESH_TOKEN_DAYS))
        .build();

    CookieJar::new().add(access).add(refresh)
}

fn clear_auth_cookies() -> CookieJar {
    let access = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build(("refresh_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Mints an access token and a fresh refresh token for the user.
async fn issue_session(state: &SharedState, user_id: Uuid) -> Result<TokenPair, AppError> {
    let access = encode_token(&Claims::new(user_id), &state.config.jwt_secret)
        .map_err(AppError::Internal)?;

    db::refresh_tokens::delete_expired(&state.pool, user_id).await?;

    let refresh = tokens::generate_token();
    db::refresh_tokens::create(
        &state.pool,
        user_id,
        &tokens::digest(&refresh),
        Utc::now() + Duration::days(REFRESH_TOKEN_DAYS),
    )
    .await?;

    Ok(TokenPair { access, refresh })
}

pub async fn register(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Response, AppError> {
    let username = req.username.unwrap_or_default().trim().to_string();
    let email = validation::normalize_email(&req.email.unwrap_or_default());
    let password_input = req.password.unwrap_or_default();

    let mut errors = Errors::new();
    errors.check("username", validation::validate_username(&username));
    errors.check("email", validation::validate_email(&email));
    if password_input.is_empty() {
        errors.add("password", "This field is required.");
    } else {
        for problem in password::validate_strength(&password_input, &username, &email) {
            errors.add("password", problem);
        }
    }

    if errors.is_empty() {
        if db::users::email_taken(&state.pool, &email).await? {
            errors.add("email", "A user with that email already exists.");
        }
        if db::users::username_taken(&state.pool, &username, None).await? {
            errors.add("username", "A user with that username already exists.");
        }
    }
    errors.into_result()?;

    let pw_hash = password::hash(&password_input).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;
    let user = db::users::create(&mut *tx, &username, &email, &pw_hash)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::field("email", "A user with that email or username already exists.")
            }
            _ => AppError::Database(e),
        })?;
    let token = tokens::issue_verification_token(&mut *tx, &user).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, "User registered");

    let email_sent = state.mailer.send_verification(&user, &token).await;
    if !email_sent {
        tracing::warn!("Failed to send verification email to {}", user.email);
    }

    let body = json!({
        "message": "Registration successful! Please check your email to verify your account.",
        "email_sent": email_sent,
        "user": PublicUser::from(&user),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn login(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    let (Some(email), Some(password_input)) = (required(req.email), required(req.password)) else {
        return Err(AppError::BadRequest(
            "Please provide both email and password".to_string(),
        ));
    };
    let email = validation::normalize_email(&email);

    if state.login_limiter.check(&email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = match db::users::find_by_email(&state.pool, &email).await? {
        Some(user) => user,
        None => {
            state.login_limiter.record_failure(&email);
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let valid = password::verify(&password_input, &user.password_hash)
        .map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(&email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    state.login_limiter.reset(&email);

    if !user.email_verified {
        return Err(AppError::EmailNotVerified(
            "Please verify your email before logging in. Check your inbox for the verification link."
                .to_string(),
        ));
    }

    let session = issue_session(&state, user.id).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    let jar = auth_cookies(&session.access, &session.refresh);
    let body = json!({
        "access": session.access,
        "refresh": session.refresh,
        "user": user,
    });
    Ok((jar, Json(body)).into_response())
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Option<JsonBody<RefreshRequest>>,
) -> Result<(CookieJar, Json<TokenPair>), AppError> {
    let refresh_value = body
        .and_then(|JsonBody(req)| required(req.refresh))
        .or_else(|| jar.get("refresh_token").map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::refresh_tokens::find_by_hash(&state.pool, &tokens::digest(&refresh_value))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    if stored.used || !db::refresh_tokens::mark_used(&state.pool, stored.id).await? {
        tracing::warn!(
            "Refresh token reuse detected for user {}. Revoking all sessions.",
            stored.user_id
        );
        db::refresh_tokens::delete_all_for_user(&state.pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let session = issue_session(&state, user.id).await?;
    Ok((auth_cookies(&session.access, &session.refresh), Json(session)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Option<JsonBody<RefreshRequest>>,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let presented = body
        .and_then(|JsonBody(req)| required(req.refresh))
        .or_else(|| jar.get("refresh_token").map(|c| c.value().to_string()));

    if let Some(token) = presented {
        db::refresh_tokens::delete_by_hash(&state.pool, &tokens::digest(&token)).await?;
    }

    Ok((clear_auth_cookies(), MessageResponse::new("Logged out successfully")))
}

pub async fn verify_email(
    State(state): State<SharedState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(token), Some(email)) = (required(query.token), required(query.email)) else {
        return Err(AppError::BadRequest(
            "Token and email are required".to_string(),
        ));
    };
    let email = validation::normalize_email(&email);

    match tokens::verify_email(&state.pool, &email, token.trim()).await? {
        VerifyOutcome::Verified => Ok(MessageResponse::new(
            "Email verified successfully! You can now log in.",
        )),
        VerifyOutcome::AlreadyVerified => Ok(MessageResponse::new(
            "Email is already verified. You can now log in.",
        )),
        VerifyOutcome::Invalid => Err(AppError::BadRequest(INVALID_VERIFICATION.to_string())),
    }
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let Some(email) = required(req.email) else {
        return Err(AppError::BadRequest("Email is required".to_string()));
    };
    let email = validation::normalize_email(&email);

    if let Some(user) = db::users::find_by_email(&state.pool, &email).await? {
        let token = tokens::issue_reset_token(&state.pool, &user).await?;
        if !state.mailer.send_password_reset(&user, &token).await {
            tracing::warn!("Failed to send password reset email to {}", user.email);
        }
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(MessageResponse::new(FORGOT_PASSWORD_MESSAGE))
}

pub async fn reset_password(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(token), Some(email), Some(new_password), Some(confirm_password)) = (
        required(req.token),
        required(req.email),
        required(req.new_password),
        required(req.confirm_password),
    ) else {
        return Err(AppError::BadRequest(
            "Token, email, new password, and confirm password are required".to_string(),
        ));
    };

    if new_password != confirm_password {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }

    let email = validation::normalize_email(&email);

    let user = tokens::consume_reset_token(&state.pool, &email, token.trim(), &new_password)
        .await
        .map_err(|e| match e {
            ResetError::Invalid => AppError::BadRequest(INVALID_RESET_LINK.to_string()),
            ResetError::Expired => AppError::BadRequest(EXPIRED_RESET_LINK.to_string()),
            ResetError::WeakPassword(problems) => AppError::BadRequest(problems.join("; ")),
            ResetError::SamePassword => AppError::BadRequest(SAME_PASSWORD.to_string()),
            ResetError::Internal(msg) => AppError::Internal(msg),
            ResetError::Database(err) => AppError::Database(err),
        })?;

    db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;

    Ok(MessageResponse::new(
        "Password has been reset successfully. You can now log in with your new password.",
    ))
}

pub async fn change_password(
    State(state): State<SharedState>,
    auth: AuthUser,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<Response, AppError> {
    let (Some(current_password), Some(new_password)) =
        (required(req.current_password), required(req.new_password))
    else {
        return Err(AppError::BadRequest(
            "Both current password and new password are required".to_string(),
        ));
    };

    let user: User = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if !password::verify(&current_password, &user.password_hash).map_err(AppError::Internal)? {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    if password::verify(&new_password, &user.password_hash).map_err(AppError::Internal)? {
        return Err(AppError::BadRequest(SAME_PASSWORD.to_string()));
    }

    let problems = password::validate_strength(&new_password, &user.username, &user.email);
    if !problems.is_empty() {
        return Err(AppError::BadRequest(problems.join("; ")));
    }

    let pw_hash = password::hash(&new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;

    // Every existing session ends; the caller gets a fresh one.
    db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;
    let session = issue_session(&state, user.id).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    let jar = auth_cookies(&session.access, &session.refresh);
    let body = json!({
        "message": "Password changed successfully",
        "access": session.access,
        "refresh": session.refresh,
    });
    Ok((jar, Json(body)).into_response())
}

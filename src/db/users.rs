use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(executor)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
}

/// Usernames are unique case-insensitively. `exclude` skips the caller's own row.
pub async fn username_taken(
    pool: &PgPool,
    username: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM users
            WHERE lower(username) = lower($1) AND ($2::uuid IS NULL OR id <> $2)
         )",
    )
    .bind(username)
    .bind(exclude)
    .fetch_one(pool)
    .await
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    username: &str,
    theme_preference: &str,
    notification_enabled: bool,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET username = $2, theme_preference = $3, notification_enabled = $4
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(username)
    .bind(theme_preference)
    .bind(notification_enabled)
    .fetch_one(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

// Token columns. Only `crate::tokens` calls these.

pub async fn set_verification_token<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    token: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET email_verification_token = $2 WHERE id = $1")
        .bind(id)
        .bind(token)
        .execute(executor)
        .await?;
    Ok(())
}

/// Flips `email_verified` and clears the token. Returns false if the row was
/// already verified or the token changed underneath us.
pub async fn mark_email_verified(
    pool: &PgPool,
    id: Uuid,
    token: &str,
    token_digest: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users
         SET email_verified = true, email_verification_token = NULL, verified_token_digest = $3
         WHERE id = $1 AND email_verified = false AND email_verification_token = $2",
    )
    .bind(id)
    .bind(token)
    .bind(token_digest)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_reset_token(
    pool: &PgPool,
    id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET password_reset_token = $2, password_reset_token_expires = $3
         WHERE id = $1",
    )
    .bind(id)
    .bind(token)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Writes the new hash and clears the reset token in one statement, guarded
/// by the token value so a token can only be consumed once.
pub async fn complete_password_reset(
    pool: &PgPool,
    id: Uuid,
    token: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users
         SET password_hash = $3, password_reset_token = NULL, password_reset_token_expires = NULL
         WHERE id = $1 AND password_reset_token = $2",
    )
    .bind(id)
    .bind(token)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

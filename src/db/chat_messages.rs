use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ChatMessage;

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    role: &str,
    content: &str,
) -> Result<ChatMessage, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(
        "INSERT INTO chat_messages (user_id, role, content) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(role)
    .bind(content)
    .fetch_one(pool)
    .await
}

/// Newest first.
pub async fn list_recent(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<ChatMessage>, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages WHERE user_id = $1
         ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<ChatMessage>, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>("SELECT * FROM chat_messages WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM chat_messages WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_all(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM chat_messages WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Drops everything but the newest `keep` messages for the user.
pub async fn prune(pool: &PgPool, user_id: Uuid, keep: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM chat_messages
         WHERE user_id = $1 AND id NOT IN (
            SELECT id FROM chat_messages WHERE user_id = $1
            ORDER BY created_at DESC LIMIT $2
         )",
    )
    .bind(user_id)
    .bind(keep)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MindfulnessSession;

pub async fn list_recent(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<MindfulnessSession>, sqlx::Error> {
    sqlx::query_as::<_, MindfulnessSession>(
        "SELECT * FROM mindfulness_sessions WHERE user_id = $1
         ORDER BY completed_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    session_type: &str,
    duration_seconds: i32,
) -> Result<MindfulnessSession, sqlx::Error> {
    sqlx::query_as::<_, MindfulnessSession>(
        "INSERT INTO mindfulness_sessions (user_id, session_type, duration_seconds)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(session_type)
    .bind(duration_seconds)
    .fetch_one(pool)
    .await
}

pub async fn delete_all(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM mindfulness_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

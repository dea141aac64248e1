use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MoodEntry;

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<MoodEntry>, sqlx::Error> {
    sqlx::query_as::<_, MoodEntry>(
        "SELECT * FROM mood_entries WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    mood: &str,
    note: &str,
    created_at: DateTime<Utc>,
) -> Result<MoodEntry, sqlx::Error> {
    sqlx::query_as::<_, MoodEntry>(
        "INSERT INTO mood_entries (user_id, mood, note, created_at)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(user_id)
    .bind(mood)
    .bind(note)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<MoodEntry>, sqlx::Error> {
    sqlx::query_as::<_, MoodEntry>("SELECT * FROM mood_entries WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// `created_at` is never touched on update.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    mood: &str,
    note: &str,
) -> Result<MoodEntry, sqlx::Error> {
    sqlx::query_as::<_, MoodEntry>(
        "UPDATE mood_entries SET mood = $3, note = $4
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(mood)
    .bind(note)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM mood_entries WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_all(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM mood_entries WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

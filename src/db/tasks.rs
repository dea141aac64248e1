use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Task;

pub struct TaskFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub priority: &'a str,
    pub status: &'a str,
    pub due_date: Option<DateTime<Utc>>,
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    fields: &TaskFields<'_>,
) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (user_id, title, description, priority, status, due_date)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(user_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.priority)
    .bind(fields.status)
    .bind(fields.due_date)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    fields: &TaskFields<'_>,
) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "UPDATE tasks
         SET title = $3, description = $4, priority = $5, status = $6, due_date = $7,
             updated_at = now()
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.priority)
    .bind(fields.status)
    .bind(fields.due_date)
    .fetch_one(pool)
    .await
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    status: &str,
) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "UPDATE tasks SET status = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

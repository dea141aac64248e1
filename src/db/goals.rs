use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Goal;

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>(
        "SELECT * FROM goals WHERE user_id = $1 ORDER BY target_date ASC, created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    description: &str,
    target_date: NaiveDate,
    status: &str,
) -> Result<Goal, sqlx::Error> {
    sqlx::query_as::<_, Goal>(
        "INSERT INTO goals (user_id, title, description, target_date, status)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(target_date)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    title: &str,
    description: &str,
    target_date: NaiveDate,
    status: &str,
) -> Result<Goal, sqlx::Error> {
    sqlx::query_as::<_, Goal>(
        "UPDATE goals
         SET title = $3, description = $4, target_date = $5, status = $6, updated_at = now()
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(target_date)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

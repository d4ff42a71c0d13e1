//! Query functions for the `household_tasks` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::HouseholdTask;

/// Insert a materialized task row. Returns the inserted task with
/// server-generated defaults (id, created_at).
///
/// Accepts any executor so materialization can run it in the same
/// transaction as the ledger insert.
pub async fn insert_task<'e>(
    executor: impl PgExecutor<'e>,
    household_id: Uuid,
    child_id: Uuid,
    title: &str,
    deadline: NaiveDate,
    weight: i16,
) -> Result<HouseholdTask> {
    let task = sqlx::query_as::<_, HouseholdTask>(
        "INSERT INTO household_tasks (household_id, child_id, title, deadline, weight) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(household_id)
    .bind(child_id)
    .bind(title)
    .bind(deadline)
    .bind(weight)
    .fetch_one(executor)
    .await
    .context("failed to insert household task")?;

    Ok(task)
}

/// Fetch a single task by ID.
pub async fn get_task(pool: &PgPool, id: Uuid) -> Result<Option<HouseholdTask>> {
    let task = sqlx::query_as::<_, HouseholdTask>("SELECT * FROM household_tasks WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch household task")?;

    Ok(task)
}

/// List all tasks for a child, earliest deadline first.
pub async fn list_tasks_for_child(pool: &PgPool, child_id: Uuid) -> Result<Vec<HouseholdTask>> {
    let tasks = sqlx::query_as::<_, HouseholdTask>(
        "SELECT * FROM household_tasks WHERE child_id = $1 ORDER BY deadline ASC, created_at ASC",
    )
    .bind(child_id)
    .fetch_all(pool)
    .await
    .context("failed to list tasks for child")?;

    Ok(tasks)
}

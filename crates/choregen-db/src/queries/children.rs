//! Query functions for the `children` table.
//!
//! Child records are owned by the (out-of-scope) household subsystem; the
//! generation core only reads them. Inserts exist for tests and for seeding.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ChildRow;

/// Insert a child row.
pub async fn insert_child(
    pool: &PgPool,
    household_id: Uuid,
    first_name: &str,
    birthdate: NaiveDate,
) -> Result<ChildRow> {
    let child = sqlx::query_as::<_, ChildRow>(
        "INSERT INTO children (household_id, first_name, birthdate) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(household_id)
    .bind(first_name)
    .bind(birthdate)
    .fetch_one(pool)
    .await
    .context("failed to insert child")?;

    Ok(child)
}

/// Fetch a single child by ID.
pub async fn get_child(pool: &PgPool, id: Uuid) -> Result<Option<ChildRow>> {
    let child = sqlx::query_as::<_, ChildRow>("SELECT * FROM children WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch child")?;

    Ok(child)
}

/// List the children of one household.
pub async fn list_for_household(pool: &PgPool, household_id: Uuid) -> Result<Vec<ChildRow>> {
    let children = sqlx::query_as::<_, ChildRow>(
        "SELECT * FROM children WHERE household_id = $1 ORDER BY birthdate ASC",
    )
    .bind(household_id)
    .fetch_all(pool)
    .await
    .context("failed to list children for household")?;

    Ok(children)
}

/// List every child across all households (used by the generation sweep).
pub async fn list_all(pool: &PgPool) -> Result<Vec<ChildRow>> {
    let children =
        sqlx::query_as::<_, ChildRow>("SELECT * FROM children ORDER BY household_id, birthdate")
            .fetch_all(pool)
            .await
            .context("failed to list children")?;

    Ok(children)
}

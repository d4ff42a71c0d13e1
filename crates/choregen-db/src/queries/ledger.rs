//! Query functions for the `generated_tasks` table -- the generation ledger.
//!
//! The ledger enforces at-most-once materialization through the unique index
//! on `generation_key`. [`insert_if_absent`] is the documented contract for
//! that mechanism: it either claims the key (returning the fresh row) or
//! reports that the key is already taken, and callers must treat the latter
//! as a normal outcome, not a failure.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{GeneratedTask, GenerationStatus};

/// Fields needed to create a ledger entry.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub template_id: Uuid,
    pub child_id: Uuid,
    pub household_id: Uuid,
    pub deadline: NaiveDate,
    pub generation_key: String,
    pub status: GenerationStatus,
}

/// Insert a ledger row keyed by `generation_key`, or do nothing if the key
/// already exists.
///
/// Returns `Some(row)` when this call claimed the key, `None` when another
/// insert (possibly from a concurrent sweep) got there first. The unique
/// index serializes racing callers; exactly one of them gets `Some`.
///
/// Accepts any executor so it can run inside a caller-owned transaction.
pub async fn insert_if_absent<'e>(
    executor: impl PgExecutor<'e>,
    entry: &NewLedgerEntry,
) -> Result<Option<GeneratedTask>> {
    let row = sqlx::query_as::<_, GeneratedTask>(
        "INSERT INTO generated_tasks \
             (template_id, child_id, household_id, deadline, generation_key, status) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (generation_key) DO NOTHING \
         RETURNING *",
    )
    .bind(entry.template_id)
    .bind(entry.child_id)
    .bind(entry.household_id)
    .bind(entry.deadline)
    .bind(&entry.generation_key)
    .bind(entry.status)
    .fetch_optional(executor)
    .await
    .context("failed to insert ledger entry")?;

    Ok(row)
}

/// Fetch a ledger entry by its generation key.
pub async fn get_by_generation_key(pool: &PgPool, key: &str) -> Result<Option<GeneratedTask>> {
    let row = sqlx::query_as::<_, GeneratedTask>(
        "SELECT * FROM generated_tasks WHERE generation_key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
    .context("failed to fetch ledger entry by generation key")?;

    Ok(row)
}

/// Promote a `pending` entry to `created`, claiming it for materialization.
///
/// Returns the promoted row, or `None` when no pending entry exists under
/// the key (fresh key, or one already created/skipped/expired). The status
/// predicate doubles as optimistic locking: racing callers get at most one
/// `Some`.
///
/// Accepts any executor so promotion can share the materializing
/// transaction.
pub async fn promote_pending<'e>(
    executor: impl PgExecutor<'e>,
    generation_key: &str,
) -> Result<Option<GeneratedTask>> {
    let row = sqlx::query_as::<_, GeneratedTask>(
        "UPDATE generated_tasks \
         SET status = 'created' \
         WHERE generation_key = $1 AND status = 'pending' \
         RETURNING *",
    )
    .bind(generation_key)
    .fetch_optional(executor)
    .await
    .context("failed to promote pending ledger entry")?;

    Ok(row)
}

/// Mark a `pending` entry as `skipped`. Same claim semantics as
/// [`promote_pending`]; terminal entries are left untouched.
pub async fn skip_pending(pool: &PgPool, generation_key: &str) -> Result<Option<GeneratedTask>> {
    let row = sqlx::query_as::<_, GeneratedTask>(
        "UPDATE generated_tasks \
         SET status = 'skipped' \
         WHERE generation_key = $1 AND status = 'pending' \
         RETURNING *",
    )
    .bind(generation_key)
    .fetch_optional(pool)
    .await
    .context("failed to skip pending ledger entry")?;

    Ok(row)
}

/// Set the `task_id` backlink on a ledger entry after its task row exists.
///
/// Accepts any executor so materialization can run it in the same
/// transaction as the task insert.
pub async fn set_task_id<'e>(
    executor: impl PgExecutor<'e>,
    ledger_id: Uuid,
    task_id: Uuid,
) -> Result<()> {
    let result = sqlx::query("UPDATE generated_tasks SET task_id = $1 WHERE id = $2")
        .bind(task_id)
        .bind(ledger_id)
        .execute(executor)
        .await
        .context("failed to set task_id on ledger entry")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("ledger entry {ledger_id} not found");
    }

    Ok(())
}

/// List all ledger entries for a child, newest deadline first.
pub async fn list_for_child(pool: &PgPool, child_id: Uuid) -> Result<Vec<GeneratedTask>> {
    let rows = sqlx::query_as::<_, GeneratedTask>(
        "SELECT * FROM generated_tasks WHERE child_id = $1 ORDER BY deadline DESC, created_at DESC",
    )
    .bind(child_id)
    .fetch_all(pool)
    .await
    .context("failed to list ledger entries for child")?;

    Ok(rows)
}

/// Transition `pending`, unacknowledged entries whose deadline has passed to
/// `expired`. Returns the expired rows.
///
/// The `status = 'pending'` predicate doubles as optimistic locking: an entry
/// that was concurrently materialized or skipped is left untouched.
pub async fn expire_overdue_pending(pool: &PgPool, as_of: NaiveDate) -> Result<Vec<GeneratedTask>> {
    let rows = sqlx::query_as::<_, GeneratedTask>(
        "UPDATE generated_tasks \
         SET status = 'expired' \
         WHERE status = 'pending' \
           AND acknowledged = FALSE \
           AND deadline < $1 \
         RETURNING *",
    )
    .bind(as_of)
    .fetch_all(pool)
    .await
    .context("failed to expire overdue pending entries")?;

    Ok(rows)
}

/// Mark a `created` entry as acknowledged by the consuming task subsystem.
///
/// Returns the number of rows affected (0 when the entry is missing or not
/// in `created` status).
pub async fn acknowledge(pool: &PgPool, ledger_id: Uuid, actor: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE generated_tasks \
         SET acknowledged = TRUE, acknowledged_at = NOW(), acknowledged_by = $1 \
         WHERE id = $2 AND status = 'created'",
    )
    .bind(actor)
    .bind(ledger_id)
    .execute(pool)
    .await
    .context("failed to acknowledge ledger entry")?;

    Ok(result.rows_affected())
}

/// Status counts over the whole ledger.
#[derive(Debug, Clone, Default)]
pub struct LedgerCounts {
    pub pending: i64,
    pub created: i64,
    pub skipped: i64,
    pub expired: i64,
    pub total: i64,
}

/// Count ledger entries by status.
pub async fn counts(pool: &PgPool) -> Result<LedgerCounts> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status::text, COUNT(*) as cnt FROM generated_tasks GROUP BY status",
    )
    .fetch_all(pool)
    .await
    .context("failed to count ledger entries")?;

    let mut out = LedgerCounts::default();
    for (status, count) in &rows {
        match status.as_str() {
            "pending" => out.pending = *count,
            "created" => out.created = *count,
            "skipped" => out.skipped = *count,
            "expired" => out.expired = *count,
            _ => {}
        }
        out.total += count;
    }
    Ok(out)
}

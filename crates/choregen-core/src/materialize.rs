//! Turn generation candidates into persisted tasks, exactly once.
//!
//! The sweep records each due candidate as a `pending` ledger offer
//! ([`record_pending`]). A confirmation ([`materialize`]) promotes the offer
//! to `created` and inserts the task row in the same transaction; a decline
//! ([`skip`]) marks it `skipped`; an offer whose deadline passes unclaimed
//! is swept to `expired` by `ledger::expire_overdue_pending`.
//!
//! The ledger's unique `generation_key` index is the only deduplication
//! mechanism: claiming the key and creating the task happen in one
//! transaction, so a candidate either fully materializes or leaves no trace.
//! Re-running a sweep over the same candidates is a no-op.

use anyhow::{Context, bail};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use choregen_db::models::GenerationStatus;
use choregen_db::queries::{ledger, tasks};

use crate::planner::GenerationCandidate;

/// Result of materializing a single candidate.
#[derive(Debug, Clone)]
pub struct MaterializeOutcome {
    /// True when this call created the task; false when the generation key
    /// was already claimed by an earlier run.
    pub created: bool,
    pub generated_id: Uuid,
    pub task_id: Option<Uuid>,
}

fn ledger_entry(candidate: &GenerationCandidate, status: GenerationStatus) -> ledger::NewLedgerEntry {
    ledger::NewLedgerEntry {
        template_id: candidate.template_id,
        child_id: candidate.child_id,
        household_id: candidate.household_id,
        deadline: candidate.deadline,
        generation_key: candidate.generation_key.clone(),
        status,
    }
}

/// Record a candidate as a `pending` offer awaiting confirmation.
///
/// The sweep calls this for every due candidate; the entry sits in the
/// ledger until it is materialized, skipped, or expires. Returns false when
/// the key is already present (pending or otherwise), in which case nothing
/// is written.
pub async fn record_pending(
    pool: &PgPool,
    candidate: &GenerationCandidate,
) -> anyhow::Result<bool> {
    let entry = ledger_entry(candidate, GenerationStatus::Pending);
    let row = ledger::insert_if_absent(pool, &entry).await?;
    if row.is_some() {
        info!(
            template_id = %candidate.template_id,
            child_id = %candidate.child_id,
            deadline = %candidate.deadline,
            "recorded pending candidate"
        );
    }
    Ok(row.is_some())
}

/// Materialize one candidate: claim its generation key and create the task
/// row in a single transaction.
///
/// A `pending` offer under the key is promoted to `created`; a fresh key is
/// claimed directly. If the key is already in a terminal state (an earlier
/// confirmation, a concurrent sweep, or a user skip), nothing is written and
/// the existing ledger entry is reported.
pub async fn materialize(
    pool: &PgPool,
    candidate: &GenerationCandidate,
) -> anyhow::Result<MaterializeOutcome> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let entry = ledger_entry(candidate, GenerationStatus::Created);
    let row = match ledger::insert_if_absent(&mut *tx, &entry).await? {
        Some(row) => row,
        // Key taken: if it is a pending offer, claim it in this transaction.
        None => match ledger::promote_pending(&mut *tx, &candidate.generation_key).await? {
            Some(row) => row,
            None => {
                // Terminal entry. The open transaction wrote nothing;
                // surface the existing entry instead.
                drop(tx);
                let Some(existing) =
                    ledger::get_by_generation_key(pool, &candidate.generation_key).await?
                else {
                    bail!(
                        "generation key {} vanished between conflict and lookup",
                        candidate.generation_key
                    );
                };
                debug!(
                    generation_key = %candidate.generation_key,
                    status = %existing.status,
                    "candidate already in ledger, skipping"
                );
                return Ok(MaterializeOutcome {
                    created: false,
                    generated_id: existing.id,
                    task_id: existing.task_id,
                });
            }
        },
    };

    let task = tasks::insert_task(
        &mut *tx,
        candidate.household_id,
        candidate.child_id,
        &candidate.title,
        candidate.deadline,
        candidate.weight as i16,
    )
    .await?;
    ledger::set_task_id(&mut *tx, row.id, task.id).await?;

    tx.commit().await.context("failed to commit task generation")?;

    info!(
        task_id = %task.id,
        template_id = %candidate.template_id,
        child_id = %candidate.child_id,
        deadline = %candidate.deadline,
        "generated task"
    );
    Ok(MaterializeOutcome {
        created: true,
        generated_id: row.id,
        task_id: Some(task.id),
    })
}

/// Record a user's decision to skip a candidate.
///
/// Marks a `pending` offer as `skipped`, or writes a fresh `skipped` entry
/// when no offer exists yet, so future sweeps will not re-offer the
/// candidate. Returns false when the key is already in a terminal state, in
/// which case the earlier decision stands.
pub async fn skip(pool: &PgPool, candidate: &GenerationCandidate) -> anyhow::Result<bool> {
    let entry = ledger_entry(candidate, GenerationStatus::Skipped);
    let skipped = match ledger::insert_if_absent(pool, &entry).await? {
        Some(_) => true,
        None => ledger::skip_pending(pool, &candidate.generation_key)
            .await?
            .is_some(),
    };
    if skipped {
        info!(
            template_id = %candidate.template_id,
            child_id = %candidate.child_id,
            deadline = %candidate.deadline,
            "skipped candidate"
        );
    }
    Ok(skipped)
}

/// Per-candidate record in a batch result.
#[derive(Debug, Clone)]
pub struct GenerationDetail {
    pub template_id: Uuid,
    pub child_id: Uuid,
    pub title: String,
    pub created: bool,
    pub error: Option<String>,
}

/// Summary of one generation sweep.
#[derive(Debug, Clone, Default)]
pub struct TaskGenerationResult {
    /// Tasks created by this sweep.
    pub generated: usize,
    /// Candidates whose key was already claimed.
    pub skipped: usize,
    /// Candidates that failed; see `details` for messages.
    pub errors: usize,
    pub details: Vec<GenerationDetail>,
}

impl TaskGenerationResult {
    pub fn record(&mut self, detail: GenerationDetail) {
        if detail.error.is_some() {
            self.errors += 1;
        } else if detail.created {
            self.generated += 1;
        } else {
            self.skipped += 1;
        }
        self.details.push(detail);
    }
}

/// Materialize a batch of candidates, isolating failures.
///
/// One candidate failing (constraint violation, connection drop mid-item)
/// does not abort the rest; the summary reports it alongside the successes.
pub async fn materialize_batch(
    pool: &PgPool,
    candidates: &[GenerationCandidate],
) -> TaskGenerationResult {
    let mut result = TaskGenerationResult::default();
    for candidate in candidates {
        let detail = match materialize(pool, candidate).await {
            Ok(outcome) => GenerationDetail {
                template_id: candidate.template_id,
                child_id: candidate.child_id,
                title: candidate.title.clone(),
                created: outcome.created,
                error: None,
            },
            Err(e) => GenerationDetail {
                template_id: candidate.template_id,
                child_id: candidate.child_id,
                title: candidate.title.clone(),
                created: false,
                error: Some(format!("{e:#}")),
            },
        };
        result.record(detail);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(created: bool, error: Option<&str>) -> GenerationDetail {
        GenerationDetail {
            template_id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            title: "Tidy bedroom".to_owned(),
            created,
            error: error.map(str::to_owned),
        }
    }

    #[test]
    fn result_tallies_by_outcome() {
        let mut result = TaskGenerationResult::default();
        result.record(detail(true, None));
        result.record(detail(true, None));
        result.record(detail(false, None));
        result.record(detail(false, Some("connection reset")));

        assert_eq!(result.generated, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors, 1);
        assert_eq!(result.details.len(), 4);
    }
}

//! `choregen generate`, `confirm` and `skip`: the candidate lifecycle.
//!
//! The sweep (`generate`) plans candidates for one child or every registered
//! child and records the due ones as pending offers; `confirm` materializes
//! them into tasks, `skip` declines them. `--dry-run` prints the plan
//! without writing.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use choregen_core::catalog::TemplateCatalog;
use choregen_core::materialize::{self, TaskGenerationResult};
use choregen_core::planner::{self, CandidateTiming, GenerationCandidate};
use choregen_db::queries::children as child_db;

use crate::resolve;

/// Run a generation sweep.
pub async fn run_generate(
    pool: &PgPool,
    catalog: &TemplateCatalog,
    child_id_str: Option<&str>,
    country: &str,
    as_of: NaiveDate,
    dry_run: bool,
) -> Result<()> {
    let candidates = collect_due_candidates(pool, catalog, child_id_str, country, as_of).await?;

    if candidates.is_empty() {
        println!("Nothing due as of {as_of}.");
        return Ok(());
    }

    if dry_run {
        println!("Would offer {} task(s):", candidates.len());
        for c in &candidates {
            println!(
                "  {} for child {} (deadline {}, weight {})",
                c.title, c.child_id, c.deadline, c.weight
            );
        }
        return Ok(());
    }

    let mut recorded = 0usize;
    let mut existing = 0usize;
    let mut errors = 0usize;
    for candidate in &candidates {
        match materialize::record_pending(pool, candidate).await {
            Ok(true) => recorded += 1,
            Ok(false) => existing += 1,
            Err(e) => {
                errors += 1;
                println!(
                    "  FAILED {} (child {}): {e:#}",
                    candidate.title, candidate.child_id
                );
            }
        }
    }
    println!(
        "Sweep complete: {recorded} offered, {existing} already in the ledger, {errors} failed."
    );

    if errors > 0 {
        anyhow::bail!("{errors} candidate(s) failed to record");
    }
    Ok(())
}

/// `choregen confirm`: materialize pending candidates into tasks.
///
/// With a template ID, confirms that one candidate; without, confirms every
/// due candidate for the child.
pub async fn run_confirm(
    pool: &PgPool,
    catalog: &TemplateCatalog,
    child_id_str: &str,
    template_id_str: Option<&str>,
    country: &str,
    as_of: NaiveDate,
) -> Result<()> {
    let (child, overrides) = resolve::child_with_overrides(pool, child_id_str).await?;
    let mut candidates = planner::plan_for_child(catalog, &child, &overrides, country, as_of);
    candidates.retain(|c| c.timing == CandidateTiming::Due);

    if let Some(id_str) = template_id_str {
        let template_id = Uuid::parse_str(id_str)
            .with_context(|| format!("invalid template ID: {id_str}"))?;
        candidates.retain(|c| c.template_id == template_id);
        if candidates.is_empty() {
            anyhow::bail!("template {template_id} has no due candidate for this child");
        }
    }

    if candidates.is_empty() {
        println!("Nothing due as of {as_of}.");
        return Ok(());
    }

    let result = materialize::materialize_batch(pool, &candidates).await;
    print_summary(&result);

    if result.errors > 0 {
        anyhow::bail!("{} candidate(s) failed to materialize", result.errors);
    }
    Ok(())
}

/// `choregen skip`: record a decision not to generate one candidate.
pub async fn run_skip(
    pool: &PgPool,
    catalog: &TemplateCatalog,
    child_id_str: &str,
    template_id_str: &str,
    country: &str,
    as_of: NaiveDate,
) -> Result<()> {
    let template_id = Uuid::parse_str(template_id_str)
        .with_context(|| format!("invalid template ID: {template_id_str}"))?;

    let (child, overrides) = resolve::child_with_overrides(pool, child_id_str).await?;
    let candidates = planner::plan_for_child(catalog, &child, &overrides, country, as_of);
    let candidate = candidates
        .into_iter()
        .find(|c| c.template_id == template_id)
        .with_context(|| format!("template {template_id} has no pending candidate for this child"))?;

    if materialize::skip(pool, &candidate).await? {
        println!(
            "Skipped '{}' (deadline {}) for child {}.",
            candidate.title, candidate.deadline, candidate.child_id
        );
    } else {
        println!(
            "'{}' (deadline {}) was already recorded; nothing to skip.",
            candidate.title, candidate.deadline
        );
    }
    Ok(())
}

/// Plan candidates for the requested scope and keep the due ones.
async fn collect_due_candidates(
    pool: &PgPool,
    catalog: &TemplateCatalog,
    child_id_str: Option<&str>,
    country: &str,
    as_of: NaiveDate,
) -> Result<Vec<GenerationCandidate>> {
    let mut candidates = Vec::new();

    match child_id_str {
        Some(id_str) => {
            let (child, overrides) = resolve::child_with_overrides(pool, id_str).await?;
            candidates.extend(planner::plan_for_child(
                catalog, &child, &overrides, country, as_of,
            ));
        }
        None => {
            let rows = child_db::list_all(pool).await?;
            for row in &rows {
                let overrides = resolve::overrides_for_household(pool, row.household_id).await?;
                let child = resolve::to_planner_child(row);
                candidates.extend(planner::plan_for_child(
                    catalog, &child, &overrides, country, as_of,
                ));
            }
        }
    }

    candidates.retain(|c| c.timing == CandidateTiming::Due);
    Ok(candidates)
}

fn print_summary(result: &TaskGenerationResult) {
    println!(
        "Sweep complete: {} generated, {} already present, {} failed.",
        result.generated, result.skipped, result.errors
    );
    for detail in &result.details {
        if let Some(error) = &detail.error {
            println!("  FAILED {} (child {}): {error}", detail.title, detail.child_id);
        }
    }
}

//! `choregen ledger` commands: inspect and maintain the generation ledger.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use choregen_db::queries::ledger as ledger_db;

/// Show ledger counts by status.
pub async fn run_status(pool: &PgPool) -> Result<()> {
    let counts = ledger_db::counts(pool).await?;

    println!("Generation ledger:");
    println!("  pending:  {}", counts.pending);
    println!("  created:  {}", counts.created);
    println!("  skipped:  {}", counts.skipped);
    println!("  expired:  {}", counts.expired);
    println!("  total:    {}", counts.total);
    Ok(())
}

/// List ledger entries for one child.
pub async fn run_history(pool: &PgPool, child_id_str: &str) -> Result<()> {
    let child_id = Uuid::parse_str(child_id_str)
        .with_context(|| format!("invalid child ID: {child_id_str}"))?;

    let entries = ledger_db::list_for_child(pool, child_id).await?;
    if entries.is_empty() {
        println!("No generation history for child {child_id}.");
        return Ok(());
    }

    println!(
        "{:<38} {:<38} {:<12} {:<9} {:<4}",
        "ID", "TEMPLATE", "DEADLINE", "STATUS", "ACK"
    );
    println!("{}", "-".repeat(104));
    for e in &entries {
        println!(
            "{:<38} {:<38} {:<12} {:<9} {:<4}",
            e.id,
            e.template_id,
            e.deadline.to_string(),
            e.status.to_string(),
            if e.acknowledged { "yes" } else { "no" },
        );
    }
    Ok(())
}

/// Mark an entry as seen by a household member.
pub async fn run_ack(pool: &PgPool, ledger_id_str: &str, actor: &str) -> Result<()> {
    let ledger_id = Uuid::parse_str(ledger_id_str)
        .with_context(|| format!("invalid ledger entry ID: {ledger_id_str}"))?;

    let updated = ledger_db::acknowledge(pool, ledger_id, actor).await?;
    if updated == 0 {
        anyhow::bail!("ledger entry {ledger_id} not found or not in 'created' status");
    }
    println!("Acknowledged {ledger_id} as {actor}.");
    Ok(())
}

/// Expire overdue, unacknowledged pending entries.
pub async fn run_expire(pool: &PgPool, as_of: NaiveDate) -> Result<()> {
    let expired = ledger_db::expire_overdue_pending(pool, as_of).await?;

    if expired.is_empty() {
        println!("No overdue pending entries as of {as_of}.");
        return Ok(());
    }

    println!("Expired {} entr(ies):", expired.len());
    for e in &expired {
        println!(
            "  {} (template {}, deadline {})",
            e.id, e.template_id, e.deadline
        );
    }
    Ok(())
}

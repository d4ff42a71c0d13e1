//! `choregen preview` command: show what would be generated for a child.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use choregen_core::catalog::TemplateCatalog;
use choregen_core::planner::{self, PreviewStatus};

use crate::resolve;

/// Show upcoming auto-generated tasks for one child, without writing
/// anything.
pub async fn run_preview(
    pool: &PgPool,
    catalog: &TemplateCatalog,
    child_id_str: &str,
    country: &str,
    as_of: NaiveDate,
) -> Result<()> {
    let (child, overrides) = resolve::child_with_overrides(pool, child_id_str).await?;
    let previews = planner::preview_for_child(catalog, &child, &overrides, country, as_of);

    let name = child.first_name.as_deref().unwrap_or("child");
    if previews.is_empty() {
        println!("Nothing to generate for {name} as of {as_of}.");
        return Ok(());
    }

    println!(
        "Upcoming tasks for {name} ({} months old), as of {as_of}:",
        previews[0].child_age_months
    );
    println!();
    println!(
        "{:<32} {:<12} {:>10} {:<9} {:<5}",
        "TITLE", "DEADLINE", "DAYS LEFT", "STATUS", "SKIP?"
    );
    println!("{}", "-".repeat(74));
    for p in &previews {
        let status = match p.status {
            PreviewStatus::Overdue => "overdue",
            PreviewStatus::DueSoon => "due soon",
            PreviewStatus::Upcoming => "upcoming",
        };
        println!(
            "{:<32} {:<12} {:>10} {:<9} {:<5}",
            p.title,
            p.deadline.to_string(),
            p.days_until,
            status,
            if p.can_skip { "yes" } else { "no" },
        );
    }

    Ok(())
}

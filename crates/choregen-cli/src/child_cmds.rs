//! `choregen child` commands: register and list children.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use choregen_core::planner;
use choregen_db::queries::children as child_db;

/// Register a child. A missing household id starts a new household.
pub async fn run_add(
    pool: &PgPool,
    household_id_str: Option<&str>,
    first_name: &str,
    birthdate: NaiveDate,
) -> Result<()> {
    let household_id = match household_id_str {
        Some(s) => Uuid::parse_str(s).with_context(|| format!("invalid household ID: {s}"))?,
        None => Uuid::new_v4(),
    };

    let child = child_db::insert_child(pool, household_id, first_name, birthdate).await?;

    println!("Registered {} ({})", child.first_name, child.id);
    println!("  household: {}", child.household_id);
    println!("  birthdate: {}", child.birthdate);
    Ok(())
}

/// List children, of one household or all.
pub async fn run_list(pool: &PgPool, household_id_str: Option<&str>, as_of: NaiveDate) -> Result<()> {
    let children = match household_id_str {
        Some(s) => {
            let household_id =
                Uuid::parse_str(s).with_context(|| format!("invalid household ID: {s}"))?;
            child_db::list_for_household(pool, household_id).await?
        }
        None => child_db::list_all(pool).await?,
    };

    if children.is_empty() {
        println!("No children registered.");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:<12} {:>10}",
        "ID", "NAME", "BIRTHDATE", "AGE (MO)"
    );
    println!("{}", "-".repeat(84));
    for child in &children {
        println!(
            "{:<38} {:<20} {:<12} {:>10}",
            child.id,
            child.first_name,
            child.birthdate,
            planner::age_in_months(child.birthdate, as_of)
        );
    }

    Ok(())
}

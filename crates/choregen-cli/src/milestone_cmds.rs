//! `choregen milestones` command: show age-linked milestones for a child.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use choregen_core::milestones::AgeRuleStore;
use choregen_core::planner;
use choregen_db::queries::children as child_db;

/// Show milestones due now, coming up, and already passed for a child.
pub async fn run_milestones(
    pool: &PgPool,
    store: &AgeRuleStore,
    child_id_str: &str,
    look_ahead_months: u32,
    locale: &str,
    as_of: NaiveDate,
) -> Result<()> {
    let child_id = Uuid::parse_str(child_id_str)
        .with_context(|| format!("invalid child ID: {child_id_str}"))?;
    let child = child_db::get_child(pool, child_id)
        .await?
        .with_context(|| format!("child {child_id} not found"))?;

    let age = planner::age_in_months(child.birthdate, as_of);
    println!(
        "{} is {} months old ({} years)",
        child.first_name,
        age,
        age / 12
    );
    println!();

    let due = store.milestones_for_age(age);
    if !due.is_empty() {
        println!("Due this month:");
        for m in &due {
            print_milestone(m, locale);
        }
        println!();
    }

    let upcoming = store.upcoming(age, look_ahead_months);
    if upcoming.is_empty() {
        println!("Nothing coming up in the next {look_ahead_months} months.");
    } else {
        println!("Coming up (next {look_ahead_months} months):");
        for m in &upcoming {
            println!("  in {:>2} months:", m.age_months - age);
            print_milestone(m, locale);
        }
    }
    println!();

    // Completion is not tracked yet, so every past milestone shows here.
    let missed = store.missed(age, &HashSet::new());
    if !missed.is_empty() {
        println!("Already passed ({}):", missed.len());
        for m in &missed {
            println!(
                "  at {:>3} months: {}",
                m.age_months,
                m.name.get(locale)
            );
        }
    }

    Ok(())
}

fn print_milestone(m: &choregen_core::milestones::AgeMilestone, locale: &str) {
    let flag = if m.mandatory { " [mandatory]" } else { "" };
    println!("    {} ({}){flag}", m.name.get(locale), m.kind);
    if let Some(desc) = &m.description {
        let text = desc.get(locale);
        if !text.is_empty() {
            println!("      {text}");
        }
    }
}

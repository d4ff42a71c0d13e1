//! `choregen setting` commands: per-household template overrides.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use choregen_core::catalog::TemplateCatalog;
use choregen_db::queries::settings as settings_db;

/// Upsert one household's override for a template.
#[allow(clippy::too_many_arguments)]
pub async fn run_set(
    pool: &PgPool,
    catalog: &TemplateCatalog,
    household_id_str: &str,
    template_id_str: &str,
    disable: bool,
    days_before: Option<u32>,
    weight: Option<u8>,
) -> Result<()> {
    let household_id = Uuid::parse_str(household_id_str)
        .with_context(|| format!("invalid household ID: {household_id_str}"))?;
    let template_id = Uuid::parse_str(template_id_str)
        .with_context(|| format!("invalid template ID: {template_id_str}"))?;

    let template = catalog
        .get(template_id)
        .with_context(|| format!("template {template_id} not found in catalog"))?;

    let setting = settings_db::upsert_setting(
        pool,
        household_id,
        template_id,
        !disable,
        days_before.map(|d| d as i32),
        weight.map(|w| w as i16),
    )
    .await?;

    println!(
        "{} '{}' for household {}",
        if setting.is_enabled { "Enabled" } else { "Disabled" },
        template.title,
        household_id
    );
    if let Some(d) = setting.custom_days_before {
        println!("  lead time: {d} days (default {})", template.days_before_deadline);
    }
    if let Some(w) = setting.custom_weight {
        println!("  weight: {w} (default {})", template.weight);
    }
    Ok(())
}

/// List a household's overrides.
pub async fn run_list(
    pool: &PgPool,
    catalog: &TemplateCatalog,
    household_id_str: &str,
) -> Result<()> {
    let household_id = Uuid::parse_str(household_id_str)
        .with_context(|| format!("invalid household ID: {household_id_str}"))?;

    let settings = settings_db::list_for_household(pool, household_id).await?;
    if settings.is_empty() {
        println!("No overrides for household {household_id}; all templates use defaults.");
        return Ok(());
    }

    println!(
        "{:<38} {:<32} {:<9} {:>10} {:>7}",
        "TEMPLATE", "TITLE", "ENABLED", "LEAD DAYS", "WEIGHT"
    );
    println!("{}", "-".repeat(100));
    for s in &settings {
        let title = catalog
            .get(s.template_id)
            .map(|t| t.title.as_str())
            .unwrap_or("(not in catalog)");
        println!(
            "{:<38} {:<32} {:<9} {:>10} {:>7}",
            s.template_id,
            title,
            s.is_enabled,
            s.custom_days_before
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_owned()),
            s.custom_weight
                .map(|w| w.to_string())
                .unwrap_or_else(|| "-".to_owned()),
        );
    }
    Ok(())
}

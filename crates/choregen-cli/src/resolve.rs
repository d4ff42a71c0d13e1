//! Load planner inputs (child, household overrides) from the database.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use choregen_core::planner::{Child, TemplateOverride};
use choregen_db::models::{ChildRow, HouseholdTemplateSetting};
use choregen_db::queries::{children as child_db, settings as settings_db};

pub fn to_planner_child(row: &ChildRow) -> Child {
    Child {
        id: row.id,
        household_id: row.household_id,
        birthdate: row.birthdate,
        first_name: Some(row.first_name.clone()),
    }
}

pub fn to_override(row: &HouseholdTemplateSetting) -> TemplateOverride {
    TemplateOverride {
        template_id: row.template_id,
        is_enabled: row.is_enabled,
        custom_days_before: row.custom_days_before.map(|d| d.max(0) as u32),
        custom_weight: row.custom_weight.map(|w| w.clamp(0, u8::MAX as i16) as u8),
    }
}

/// Fetch a child by id string along with its household's overrides.
pub async fn child_with_overrides(
    pool: &PgPool,
    child_id_str: &str,
) -> Result<(Child, Vec<TemplateOverride>)> {
    let child_id = Uuid::parse_str(child_id_str)
        .with_context(|| format!("invalid child ID: {child_id_str}"))?;
    let row = child_db::get_child(pool, child_id)
        .await?
        .with_context(|| format!("child {child_id} not found"))?;

    let settings = settings_db::list_for_household(pool, row.household_id).await?;
    let overrides = settings.iter().map(to_override).collect();

    Ok((to_planner_child(&row), overrides))
}

/// Fetch overrides for every household that has children, keyed by
/// household id. One query per household keeps this simple; the sweep runs
/// offline where latency does not matter.
pub async fn overrides_for_household(
    pool: &PgPool,
    household_id: Uuid,
) -> Result<Vec<TemplateOverride>> {
    let settings = settings_db::list_for_household(pool, household_id).await?;
    Ok(settings.iter().map(to_override).collect())
}
